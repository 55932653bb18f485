//! Test support for the PandABox client crates.
//!
//! Provides [`MockController`], a scripted stand-in for the control
//! server: a real TCP listener that answers commands from a fixed
//! response table, so client behavior can be exercised over an actual
//! socket including reconnects, fragmentation and remote close.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

enum ScriptedReply {
    Reply(String),
    /// Read the command, then close the connection without replying.
    Close,
    /// Read the command and never reply, leaving the client to time out.
    Silence,
}

/// Builder for a [`MockController`].
#[derive(Default)]
pub struct Builder {
    responses: Vec<(String, ScriptedReply)>,
    fragmented: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Replies with `reply` whenever the full wire text `command` is
    /// received. Table commands are keyed by their complete block,
    /// including row lines and the blank terminator.
    pub fn respond(mut self, command: &str, reply: &str) -> Builder {
        self.responses
            .push((command.to_string(), ScriptedReply::Reply(reply.to_string())));
        self
    }

    /// Closes the connection after receiving `command`.
    pub fn close_on(mut self, command: &str) -> Builder {
        self.responses
            .push((command.to_string(), ScriptedReply::Close));
        self
    }

    /// Never replies to `command`, so the client's receive times out.
    pub fn silent_on(mut self, command: &str) -> Builder {
        self.responses
            .push((command.to_string(), ScriptedReply::Silence));
        self
    }

    /// Writes every reply one byte at a time to exercise the client's
    /// reassembly of fragmented responses.
    pub fn fragmented(mut self) -> Builder {
        self.fragmented = true;
        self
    }

    pub fn start(self) -> MockController {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock listener");
        let addr = listener.local_addr().expect("mock listener address");
        let received = Arc::new(Mutex::new(Vec::new()));

        let responses: HashMap<String, ScriptedReply> = self.responses.into_iter().collect();
        let fragmented = self.fragmented;
        let log = Arc::clone(&received);
        thread::spawn(move || {
            // Connections are served one at a time; the client is strictly
            // synchronous and reconnects sequentially (e.g. during design
            // capture).
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &responses, fragmented, &log);
            }
        });

        MockController { addr, received }
    }
}

/// A scripted control server listening on an ephemeral local port.
pub struct MockController {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockController {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Starts a controller answering from a plain command/reply table.
    pub fn start(responses: &[(&str, &str)]) -> MockController {
        responses
            .iter()
            .fold(Builder::new(), |builder, (command, reply)| {
                builder.respond(command, reply)
            })
            .start()
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every command received so far, in order, as full wire text.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("mock state poisoned").clone()
    }
}

fn serve(
    stream: TcpStream,
    responses: &HashMap<String, ScriptedReply>,
    fragmented: bool,
    log: &Mutex<Vec<String>>,
) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });
    let mut writer = stream;

    loop {
        let mut command = String::new();
        match reader.read_line(&mut command) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        // Table assignments span multiple lines up to a blank terminator.
        if command.trim_end().contains('<') {
            loop {
                let mut row = String::new();
                match reader.read_line(&mut row) {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                }
                let done = row == "\n";
                command.push_str(&row);
                if done {
                    break;
                }
            }
        }

        log.lock().expect("mock state poisoned").push(command.clone());

        match responses.get(&command) {
            Some(ScriptedReply::Close) => return,
            Some(ScriptedReply::Silence) => {
                // Swallow the command; keep the connection open so the
                // client blocks until its timeout fires.
                continue;
            }
            Some(ScriptedReply::Reply(reply)) => {
                if write_reply(&mut writer, reply, fragmented).is_err() {
                    return;
                }
            }
            None => {
                if write_reply(&mut writer, "ERR Unknown command\n", fragmented).is_err() {
                    return;
                }
            }
        }
    }
}

fn write_reply(writer: &mut TcpStream, reply: &str, fragmented: bool) -> std::io::Result<()> {
    if fragmented {
        for byte in reply.as_bytes() {
            writer.write_all(std::slice::from_ref(byte))?;
            writer.flush()?;
        }
        Ok(())
    } else {
        writer.write_all(reply.as_bytes())
    }
}
