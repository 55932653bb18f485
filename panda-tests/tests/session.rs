//! Session-level behavior over a real socket: classification of replies,
//! response-kind contracts, failure semantics and teardown.

use std::time::Duration;

use panda_client::{Error, PandA, QueryResponse};
use panda_protocol::TableOp;
use panda_protocol::seq::{SeqPhase, SeqTrigger};
use panda_tests::MockController;

const TEST_IDN: &str = "PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server";

fn connect(mock: &MockController) -> PandA {
    let mut panda = PandA::new(mock.host()).port(mock.port());
    panda.connect().expect("connect to mock");
    panda
}

#[test]
fn query_returns_single_value() {
    let mock = MockController::start(&[("*IDN?\n", "OK =PandA SW: 2.0.2 FPGA: 0.0.0 00000000 00000000 rootfs: Test Server\n")]);
    let mut panda = connect(&mock);
    assert_eq!(
        panda.query("*IDN").unwrap(),
        QueryResponse::Single(TEST_IDN.to_string())
    );
}

#[test]
fn query_appends_missing_suffix() {
    let mock = MockController::start(&[("TTLIN1.TERM?\n", "OK =50-Ohm\n")]);
    let mut panda = connect(&mock);
    panda.query("TTLIN1.TERM").unwrap();
    assert_eq!(mock.received(), vec!["TTLIN1.TERM?\n"]);
}

#[test]
fn query_returns_multi_values_in_order() {
    let mock = MockController::start(&[("ADC.*?\n", "!OUT 0 pos_out\n!IN 1 pos_in\n.\n")]);
    let mut panda = connect(&mock);
    assert_eq!(
        panda.query("ADC.*").unwrap(),
        QueryResponse::Multi(vec!["OUT 0 pos_out".to_string(), "IN 1 pos_in".to_string()])
    );
}

#[test]
fn lone_terminator_is_empty_multi_value() {
    let mock = MockController::start(&[("PCOMP4.TABLE.B?\n", ".\n")]);
    let mut panda = connect(&mock);
    assert_eq!(
        panda.query("PCOMP4.TABLE.B").unwrap(),
        QueryResponse::Multi(Vec::new())
    );
}

#[test]
fn query_error_reply_raises_device_error() {
    let mock = MockController::start(&[("FOO.*?\n", "ERR No such block\n")]);
    let mut panda = connect(&mock);
    match panda.query("FOO.*") {
        Err(Error::Device(message)) => assert_eq!(message, "No such block"),
        other => panic!("expected Device error, got {other:?}"),
    }
}

#[test]
fn success_reply_to_query_is_protocol_violation() {
    let mock = MockController::start(&[("TTLIN1.TERM?\n", "OK\n")]);
    let mut panda = connect(&mock);
    assert!(matches!(
        panda.query("TTLIN1.TERM"),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn assign_succeeds_on_ok() {
    let mock = MockController::start(&[("TTLIN1.TERM=50-Ohm\n", "OK\n")]);
    let mut panda = connect(&mock);
    panda.assign("TTLIN1.TERM", "50-Ohm").unwrap();
}

#[test]
fn assign_error_reply_carries_device_message() {
    let mock = MockController::start(&[("TTLIN1.TERM=100-Ohm\n", "ERR Invalid enumeration value\n")]);
    let mut panda = connect(&mock);
    match panda.assign("TTLIN1.TERM", "100-Ohm") {
        Err(Error::Device(message)) => assert_eq!(message, "Invalid enumeration value"),
        other => panic!("expected Device error, got {other:?}"),
    }
}

#[test]
fn value_reply_to_assignment_is_protocol_violation() {
    let mock = MockController::start(&[("TTLIN1.TERM=50-Ohm\n", "OK =50-Ohm\n")]);
    let mut panda = connect(&mock);
    assert!(matches!(
        panda.assign("TTLIN1.TERM", "50-Ohm"),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn assign_table_sends_rows_and_terminator() {
    let mock = MockController::start(&[("PGEN1.TABLE<\n1\n2\n3\n\n", "OK\n")]);
    let mut panda = connect(&mock);
    panda
        .assign_table("PGEN1.TABLE", TableOp::Overwrite, [1, 2, 3])
        .unwrap();
    assert_eq!(mock.received(), vec!["PGEN1.TABLE<\n1\n2\n3\n\n"]);
}

#[test]
fn empty_table_assignment_is_header_and_blank_line() {
    let mock = MockController::start(&[("PGEN1.TABLE<\n\n", "OK\n")]);
    let mut panda = connect(&mock);
    panda
        .assign_table("PGEN1.TABLE", TableOp::Overwrite, Vec::<String>::new())
        .unwrap();
    assert_eq!(mock.received(), vec!["PGEN1.TABLE<\n\n"]);
}

#[test]
fn assign_table_error_reply_carries_device_message() {
    let mock = MockController::start(&[("PGEN1.TABLE<\nfoo\nbar\nbaz\n\n", "ERR Number missing\n")]);
    let mut panda = connect(&mock);
    match panda.assign_table("PGEN1.TABLE", TableOp::Overwrite, ["foo", "bar", "baz"]) {
        Err(Error::Device(message)) => assert_eq!(message, "Number missing"),
        other => panic!("expected Device error, got {other:?}"),
    }
}

#[test]
fn malformed_reply_is_protocol_violation() {
    let mock = MockController::start(&[("TTLIN1.TERM?\n", "WAT\n")]);
    let mut panda = connect(&mock);
    assert!(matches!(
        panda.query("TTLIN1.TERM"),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn operations_require_connection() {
    let mock = MockController::start(&[]);
    let mut panda = PandA::new(mock.host()).port(mock.port());
    assert!(matches!(panda.query("*IDN"), Err(Error::NotConnected)));
    assert!(matches!(
        panda.assign("TTLIN1.TERM", "50-Ohm"),
        Err(Error::NotConnected)
    ));
}

#[test]
fn connect_is_idempotent() {
    let mock = MockController::start(&[("*IDN?\n", "OK =x\n")]);
    let mut panda = connect(&mock);
    panda.connect().unwrap();
    assert!(panda.is_connected());
    panda.query("*IDN").unwrap();
}

#[test]
fn disconnect_twice_is_harmless() {
    let mock = MockController::start(&[]);
    let mut panda = connect(&mock);
    panda.disconnect();
    panda.disconnect();
    assert!(!panda.is_connected());
}

#[test]
fn connect_to_unreachable_host_fails() {
    let mut panda = PandA::new("127.0.0.1")
        .port(1) // nothing listens here
        .timeout(Duration::from_millis(200));
    assert!(matches!(panda.connect(), Err(Error::Connect { .. })));
    assert!(!panda.is_connected());
}

#[test]
fn remote_close_surfaces_and_disconnects() {
    let mock = MockController::builder()
        .close_on("TTLIN1.TERM?\n")
        .start();
    let mut panda = connect(&mock);
    assert!(matches!(
        panda.query("TTLIN1.TERM"),
        Err(Error::RemoteClosed)
    ));
    assert!(!panda.is_connected());
}

#[test]
fn receive_timeout_surfaces_and_disconnects() {
    let mock = MockController::builder()
        .silent_on("TTLIN1.TERM?\n")
        .start();
    let mut panda = PandA::new(mock.host())
        .port(mock.port())
        .timeout(Duration::from_millis(150));
    panda.connect().unwrap();
    assert!(matches!(panda.query("TTLIN1.TERM"), Err(Error::Timeout)));
    assert!(!panda.is_connected());
}

#[test]
fn fragmented_replies_are_reassembled() {
    let mock = MockController::builder()
        .respond("ADC.*?\n", "!OUT 0 pos_out\n!IN 1 pos_in\n.\n")
        .fragmented()
        .start();
    let mut panda = connect(&mock);
    assert_eq!(
        panda.query("ADC.*").unwrap(),
        QueryResponse::Multi(vec!["OUT 0 pos_out".to_string(), "IN 1 pos_in".to_string()])
    );
}

#[test]
fn query_value_parses_numbers() {
    let mock = MockController::start(&[
        ("PULSE1.DELAY?\n", "OK =2.5\n"),
        ("PULSE1.QUEUE?\n", "OK =3\n"),
        ("PULSE1.DELAY.UNITS?\n", "OK =ms\n"),
    ]);
    let mut panda = connect(&mock);
    assert_eq!(panda.query_value("PULSE1.DELAY").unwrap(), 2.5);
    assert_eq!(panda.query_value("PULSE1.QUEUE").unwrap(), 3.0);
    assert!(matches!(
        panda.query_value("PULSE1.DELAY.UNITS"),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn send_seq_table_writes_packed_rows() {
    let mock = MockController::start(&[(
        "SEQ1.TABLE<\n1048577 0 1 2\n1048577 1 1 2\n1048577 2 1 2\n\n",
        "OK\n",
    )]);
    let mut panda = connect(&mock);
    let phase1 = SeqPhase {
        a: true,
        ..SeqPhase::NONE
    };
    panda
        .send_seq_table(
            1,
            1,
            SeqTrigger::Immediate,
            &[0, 1, 2],
            1,
            phase1,
            2,
            SeqPhase::NONE,
        )
        .unwrap();
    assert_eq!(
        mock.received(),
        vec!["SEQ1.TABLE<\n1048577 0 1 2\n1048577 1 1 2\n1048577 2 1 2\n\n"]
    );
}

#[test]
fn capture_channel_count_counts_multi_values() {
    let mock = MockController::start(&[("*CAPTURE?\n", "!PGEN1.OUT\n!ADC1.OUT\n.\n")]);
    let mut panda = connect(&mock);
    assert_eq!(panda.capture_channel_count().unwrap(), 2);
}
