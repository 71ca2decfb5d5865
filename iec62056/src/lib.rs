//! IEC 62056-21 optical meter readout engine
//!
//! Reads electricity meters over the serial, checksum-framed exchange of
//! IEC 62056-21 mode C (request, identification, baud negotiation, data
//! block) and turns one exchange into typed register readings.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `iec-core`: Error taxonomy, baud rates, register data model
//! - `iec-transport`: Link driver (serial port, timeouts, baud switching,
//!   port exclusivity)
//! - `iec-session`: Protocol layer (frame codec, BCC validation, handshake
//!   state machine, register parser)
//! - `iec-client`: Meter session facade
//!
//! # Usage
//!
//! ```no_run
//! use iec62056::{ConnectionParameters, MeterSession, ReadMode};
//!
//! # async fn read() {
//! let params = ConnectionParameters::builder("/dev/ttyUSB0")
//!     .build()
//!     .expect("valid parameters");
//! let mut session = MeterSession::serial(params);
//! let result = session.read(ReadMode::Parsed).await;
//! # }
//! ```
//!
//! One `read()` call is one complete, independent session: the port is opened
//! for the exchange and released on every exit path. The engine performs no
//! retries; the caller's polling layer decides what to do with a failure.

// Re-export core types
pub use iec_core::{BaudRate, ErrorKind, IecError, IecResult, Register, RegisterValue};

// Re-export the session facade
pub use iec_client::{ConnectionParameters, MeterSession, ParametersBuilder, ReadMode, SessionResult};

// Re-export protocol-level configuration
pub use iec_session::{ChecksumKind, Identification, ProtocolTiming};

// Transport layer, for callers that supply their own link
pub mod transport {
    pub use iec_transport::*;
}

// Protocol layer, for callers that drive exchanges directly
pub mod session {
    pub use iec_session::*;
}
