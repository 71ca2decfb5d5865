//! Link driver for IEC 62056-21 meter readout
//!
//! This crate owns all physical I/O: opening and closing the serial port,
//! byte-level reads and writes with mandatory timeouts, and mid-session baud
//! rate switching. Everything above it (frame codec, state machine, parser)
//! is pure transformation.

pub mod port_guard;
pub mod serial;
pub mod stream;

pub use port_guard::{PortClaim, claim};
pub use serial::{SerialSettings, SerialTransport};
pub use stream::MeterLink;
