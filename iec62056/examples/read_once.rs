//! One-shot meter readout
//!
//! Runs a single readout session against a locally attached meter and prints
//! the registers it reports.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example read_once -- /dev/ttyUSB0
//! ```

use anyhow::{Context, bail};
use iec62056::{BaudRate, ConnectionParameters, MeterSession, ReadMode, SessionResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = std::env::args()
        .nth(1)
        .context("usage: read_once <serial-port>")?;

    let params = ConnectionParameters::builder(&port)
        .max_baud(BaudRate::B9600)
        .build()
        .context("invalid connection parameters")?;

    println!("Reading meter on {} ...", port);
    let mut session = MeterSession::serial(params);

    match session.read(ReadMode::Parsed).await {
        SessionResult::Registers { registers, skipped } => {
            for register in &registers {
                match &register.unit {
                    Some(unit) => println!("{:<12} {} {}", register.address, register.value, unit),
                    None => println!("{:<12} {}", register.address, register.value),
                }
            }
            if skipped > 0 {
                println!("({} line(s) could not be parsed)", skipped);
            }
        }
        SessionResult::Raw { bytes } => {
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        SessionResult::Failure { kind, detail } => {
            bail!("readout failed ({:?}): {}", kind, detail);
        }
    }

    Ok(())
}
