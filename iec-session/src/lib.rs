//! Protocol layer for IEC 62056-21 meter readout
//!
//! This crate holds the pure protocol logic between the link driver and the
//! session facade: the frame codec (request/acknowledgement encoding, block
//! extraction, checksum validation), identification parsing, the handshake
//! state machine and the register parser.

pub mod bcc;
pub mod exchange;
pub mod frame;
pub mod identity;
pub mod readout;
pub mod state;

pub use bcc::{BccCalc, ChecksumKind};
pub use exchange::{ExchangeConfig, ProtocolTiming, Readout, ReadoutExchange};
pub use frame::{RawFrame, ValidatedBlock, encode_ack, encode_request, extract_bare_readout};
pub use identity::Identification;
pub use readout::{ParsedReadout, parse};
pub use state::SessionState;
