//! Meter session client for IEC 62056-21 readout
//!
//! This crate provides the public entry point of the readout engine: build
//! [`ConnectionParameters`] for a port, create a [`MeterSession`] and call
//! [`MeterSession::read`]. One call runs one complete handshake and data
//! read and returns a [`SessionResult`]; retry policy stays with the caller.

pub mod params;
pub mod session;

pub use params::{ConnectionParameters, ParametersBuilder};
pub use session::{MeterSession, ReadMode, SessionResult};
