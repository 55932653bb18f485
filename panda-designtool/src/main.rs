//! # PandABox Design Tool
//!
//! Command line access to the PandABox control port: capture the current
//! block design to a file, restore a previously saved design, or issue
//! ad-hoc queries and assignments.
//!
//! ## Overview
//!
//! Designs are plain text scripts replayable through the control
//! protocol; the first line records the firmware identification observed
//! at capture time, and a restore validates it against the live device
//! unless `--force` is given.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use panda_client::{PandA, QueryResponse};
use panda_protocol::TableOp;

#[derive(Parser, Eq, PartialEq, Clone)]
enum Action {
    /// Capture the current design to a file
    Save { file: PathBuf },
    /// Restore a design from a file
    Load {
        file: PathBuf,
        #[arg(short, long, help = "Skip the firmware compatibility check")]
        force: bool,
    },
    /// Query a target and print its value(s)
    Query { target: String },
    /// Assign a scalar value to a target
    Assign { target: String, value: String },
    /// Overwrite a table field with the given rows
    Table {
        target: String,
        rows: Vec<String>,
        #[arg(short, long, help = "Append to the table instead of overwriting")]
        append: bool,
    },
}

#[derive(Parser)]
#[command(about = "Save and restore PandABox block designs", long_about = None)]
struct Args {
    /// Controller host name or address
    host: String,

    #[arg(short, long, default_value = "8888")]
    port: u16,

    #[arg(
        short,
        long,
        help = "Session timeout in seconds",
        default_value = "5"
    )]
    timeout: u64,

    #[clap(subcommand)]
    action: Action,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: host={}, port={}", args.host, args.port);

    let mut panda = PandA::new(args.host.as_str())
        .port(args.port)
        .timeout(Duration::from_secs(args.timeout));
    panda.connect()?;
    log::info!("Connected to {}:{}", args.host, args.port);

    match args.action {
        Action::Save { file } => {
            panda.save_design(&file)?;
            log::info!("Design written to {}", file.display());
        }
        Action::Load { file, force } => {
            let warnings = panda.load_design(&file, force)?;
            log::info!(
                "Design {} applied ({} firmware warning(s))",
                file.display(),
                warnings.len()
            );
        }
        Action::Query { target } => match panda.query(&target)? {
            QueryResponse::Single(value) => println!("{value}"),
            QueryResponse::Multi(values) => {
                for value in values {
                    println!("{value}");
                }
            }
        },
        Action::Assign { target, value } => {
            panda.assign(&target, &value)?;
            log::info!("{target} set");
        }
        Action::Table {
            target,
            rows,
            append,
        } => {
            let op = if append {
                TableOp::Append
            } else {
                TableOp::Overwrite
            };
            panda.assign_table(&target, op, rows)?;
            log::info!("{target} written");
        }
    }

    panda.disconnect();
    Ok(())
}
