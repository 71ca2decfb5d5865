//! One complete readout exchange over a meter link
//!
//! Drives the link through the request/identify/baud-switch/data-block
//! sequence. The exchange performs zero silent retries: a failed session is
//! reported as such, and any retry policy belongs to the caller, which keeps
//! a degrading link observable.

use crate::bcc::ChecksumKind;
use crate::frame::{self, LF, RawFrame, STX, ValidatedBlock};
use crate::identity::Identification;
use crate::state::SessionState;
use bytes::BytesMut;
use iec_core::{BaudRate, IecError, IecResult};
use iec_transport::MeterLink;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest identification line the protocol allows, with margin
const MAX_IDENTIFICATION_LEN: usize = 128;

/// Block read chunk size
const READ_CHUNK: usize = 128;

/// Explicit timing of one exchange
///
/// The two delays are hard protocol requirements, not optimizations: the
/// meter needs a pause between receiving the identity acknowledgement and the
/// host switching its rate, and switching too early desynchronizes the link.
/// All values are injectable so tests run without real waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTiming {
    /// Pause between the identity line and the option select message
    pub ack_delay: Duration,
    /// Pause between the option select message and the rate change
    pub settle_delay: Duration,
    /// Window for the identification line
    pub response_timeout: Duration,
    /// Window for the complete data block
    pub block_timeout: Duration,
    /// Overall bound on the whole session, enforced by the facade
    pub deadline: Duration,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            ack_delay: Duration::from_millis(400),
            settle_delay: Duration::from_millis(400),
            response_timeout: Duration::from_secs(3),
            block_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

impl ProtocolTiming {
    /// Timing with zero settling delays, for scripted links in tests
    pub fn immediate() -> Self {
        Self {
            ack_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Configuration of one exchange
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Query code placed after the '/' of the request; "?" reads every meter
    pub query_code: String,
    /// Station address for multi-drop buses
    pub device_address: Option<String>,
    /// Rate of the opening handshake
    pub initial_baud: BaudRate,
    /// Upper bound on the negotiated rate
    pub max_baud: BaudRate,
    /// Block check algorithm of framed readouts
    pub checksum: ChecksumKind,
    /// Listen without requesting; for meters that push their readout
    pub passive: bool,
    pub timing: ProtocolTiming,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            query_code: "?".to_string(),
            device_address: None,
            initial_baud: BaudRate::B300,
            max_baud: BaudRate::B9600,
            checksum: ChecksumKind::default(),
            passive: false,
            timing: ProtocolTiming::default(),
        }
    }
}

/// Outcome of one successful exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    /// Identity captured during the handshake; absent in passive sessions
    pub identity: Option<Identification>,
    pub block: ValidatedBlock,
}

/// Drives one readout exchange over a [`MeterLink`]
pub struct ReadoutExchange<'a, L: MeterLink> {
    link: &'a mut L,
    config: &'a ExchangeConfig,
    state: SessionState,
}

impl<'a, L: MeterLink> ReadoutExchange<'a, L> {
    pub fn new(link: &'a mut L, config: &'a ExchangeConfig) -> Self {
        Self {
            link,
            config,
            state: SessionState::Idle,
        }
    }

    /// Current phase of the exchange
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the exchange to completion
    ///
    /// The link is left open; closing on every exit path is the caller's
    /// responsibility (scoped acquisition in the session facade).
    pub async fn run(&mut self) -> IecResult<Readout> {
        match self.drive().await {
            Ok(readout) => Ok(readout),
            Err(e) => {
                log::debug!("Exchange failed in {}: {}", self.state.as_str(), e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self, next: SessionState) -> IecResult<()> {
        self.state.validate_transition(next)?;
        log::debug!("{} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        Ok(())
    }

    async fn drive(&mut self) -> IecResult<Readout> {
        let timing = self.config.timing;
        self.link.open().await?;

        if self.config.passive {
            self.advance(SessionState::AwaitingDataBlock)?;
            let block = self.read_block().await?;
            self.advance(SessionState::Done)?;
            return Ok(Readout {
                identity: None,
                block,
            });
        }

        self.advance(SessionState::Requesting)?;
        let request = frame::encode_request(
            &self.config.query_code,
            self.config.device_address.as_deref(),
        );
        self.link
            .set_timeout(Some(timing.response_timeout))
            .await?;
        self.link.write_all(&request).await?;
        self.link.flush().await?;

        self.advance(SessionState::AwaitingIdentity)?;
        let identity = self.read_identity(&request).await?;

        self.advance(SessionState::SwitchingBaud)?;
        let negotiated = self.switch_baud(&identity).await?;
        log::debug!(
            "Meter {} ({}) negotiated {} baud",
            identity.manufacturer,
            identity.model,
            negotiated
        );

        self.advance(SessionState::AwaitingDataBlock)?;
        let block = self.read_block().await?;

        self.advance(SessionState::Done)?;
        Ok(Readout {
            identity: Some(identity),
            block,
        })
    }

    /// Read and parse the identification line
    ///
    /// A silent meter here means no session was established at all, which is
    /// reported as `NoResponse` rather than `Timeout`. Optical heads loop
    /// transmitted bytes back; an echoed request line is discarded once.
    async fn read_identity(&mut self, request: &[u8]) -> IecResult<Identification> {
        let mut line = self.read_line_or_no_response().await?;
        if line == request {
            log::debug!("Request was echoed, reading identification again");
            line = self.read_line_or_no_response().await?;
        }
        Identification::parse(&line)
    }

    async fn read_line_or_no_response(&mut self) -> IecResult<Vec<u8>> {
        self.link
            .read_until(LF, MAX_IDENTIFICATION_LEN)
            .await
            .map_err(|e| match e {
                IecError::Timeout => IecError::NoResponse,
                other => other,
            })
    }

    /// Acknowledge the proposed rate and reconfigure the link
    ///
    /// The proposal is clamped to the configured maximum. An unrecognized
    /// rate character falls back to the lowest safe rate instead of failing;
    /// a conservative rate is always readable.
    async fn switch_baud(&mut self, identity: &Identification) -> IecResult<BaudRate> {
        let target = match identity.proposed_baud {
            Some(proposed) => proposed.min(self.config.max_baud),
            None => BaudRate::MIN,
        };

        tokio::time::sleep(self.config.timing.ack_delay).await;
        self.link
            .write_all(&frame::encode_ack(target.rate_char()))
            .await?;
        self.link.flush().await?;
        tokio::time::sleep(self.config.timing.settle_delay).await;

        if target != self.config.initial_baud {
            self.link.set_baud_rate(target).await?;
        }
        Ok(target)
    }

    /// Accumulate bytes until the block terminator, then validate
    ///
    /// Framed readouts (STX ... ETX BCC) go through checksum validation; bare
    /// readouts terminated by `!` carry no check character on the wire.
    async fn read_block(&mut self) -> IecResult<ValidatedBlock> {
        let window = self.config.timing.block_timeout;
        let start = tokio::time::Instant::now();
        let mut received = BytesMut::with_capacity(512);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let remaining = window
                .checked_sub(start.elapsed())
                .ok_or(IecError::Timeout)?;
            self.link.set_timeout(Some(remaining)).await?;

            let n = self.link.read(&mut chunk).await?;
            if n == 0 {
                return Err(IecError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Stream closed mid-block",
                )));
            }
            received.extend_from_slice(&chunk[..n]);

            if frame::readout_complete(&received) {
                break;
            }
        }

        log::debug!("Received data block of {} bytes", received.len());
        if received.contains(&STX) {
            RawFrame::extract(&received)?.validate(self.config.checksum)
        } else {
            frame::extract_bare_readout(&received)
        }
    }
}
