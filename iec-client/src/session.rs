//! Meter session facade
//!
//! The single entry point of the engine: one `read()` call runs one complete
//! exchange and returns either the raw validated block, the parsed registers
//! or a structured failure. Nothing is retained between calls and no error
//! escapes past this boundary.

use crate::params::ConnectionParameters;
use iec_core::{ErrorKind, IecError, Register};
use iec_session::{ReadoutExchange, readout};
use iec_transport::{MeterLink, SerialSettings, SerialTransport};
use serde::Serialize;

/// What a session returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Validated block bytes, no register extraction
    Raw,
    /// Registers extracted from the validated block
    Parsed,
}

/// Terminal output of one session invocation
///
/// `skipped` on `Registers` is the count of unparseable lines: partial data
/// is still useful, so it accompanies the result instead of replacing it.
/// Every other failure replaces the result entirely; a corrupted or
/// incomplete read is never reported as a complete one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionResult {
    Raw {
        bytes: Vec<u8>,
    },
    Registers {
        registers: Vec<Register>,
        skipped: usize,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
    },
}

impl SessionResult {
    fn from_error(error: IecError) -> Self {
        SessionResult::Failure {
            kind: error.kind(),
            detail: error.to_string(),
        }
    }

    /// Failure kind, when this is a failure
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            SessionResult::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// One meter hookup
///
/// Owns the link and the caller's parameters. Every `read()` is a fresh,
/// independent session: the port is opened for the exchange and released on
/// every exit path, including timeouts, before the result is returned.
pub struct MeterSession<L: MeterLink> {
    link: L,
    params: ConnectionParameters,
}

impl MeterSession<SerialTransport> {
    /// Session over the serial port named in the parameters
    pub fn serial(params: ConnectionParameters) -> Self {
        let settings = SerialSettings::with_framing(
            params.port.clone(),
            params.initial_baud,
            params.bytesize,
            params.parity,
            params.stopbits,
        );
        Self {
            link: SerialTransport::new(settings),
            params,
        }
    }
}

impl<L: MeterLink> MeterSession<L> {
    /// Session over a caller-supplied link; used by tests to inject fakes
    pub fn with_link(params: ConnectionParameters, link: L) -> Self {
        Self { link, params }
    }

    /// Connection parameters of this hookup
    pub fn params(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Run one complete readout
    ///
    /// The whole exchange is bounded by `timing.deadline` in addition to the
    /// per-step timeouts; exceeding it aborts with a `Timeout` failure. The
    /// engine performs no retries: the caller decides, based on the returned
    /// kind, whether the next poll tries again.
    pub async fn read(&mut self, mode: ReadMode) -> SessionResult {
        let config = self.params.exchange_config();

        let outcome = tokio::time::timeout(
            config.timing.deadline,
            ReadoutExchange::new(&mut self.link, &config).run(),
        )
        .await;

        // Scoped acquisition: the port is released on every exit path,
        // deadline expiry included, before any result is returned
        let _ = self.link.close().await;

        let readout = match outcome {
            Err(_) => {
                log::warn!("Session on {} exceeded its deadline", self.params.port);
                return SessionResult::from_error(IecError::Timeout);
            }
            Ok(Err(e)) => {
                log::warn!("Session on {} failed: {}", self.params.port, e);
                return SessionResult::from_error(e);
            }
            Ok(Ok(readout)) => readout,
        };

        match mode {
            ReadMode::Raw => SessionResult::Raw {
                bytes: readout.block.into_bytes(),
            },
            ReadMode::Parsed => {
                let parsed = readout::parse(&readout.block);
                if parsed.skipped > 0 {
                    log::warn!(
                        "Readout on {} had {} unparseable line(s)",
                        self.params.port,
                        parsed.skipped
                    );
                }
                log::info!(
                    "Read {} register(s) from {}",
                    parsed.registers.len(),
                    self.params.port
                );
                SessionResult::Registers {
                    registers: parsed.registers,
                    skipped: parsed.skipped,
                }
            }
        }
    }
}
