//! Core types and utilities for IEC 62056-21 meter readout
//!
//! This crate provides the fundamental types, error handling and the register
//! data model used throughout the readout engine.

pub mod baud;
pub mod error;
pub mod register;

pub use baud::BaudRate;
pub use error::{ErrorKind, IecError, IecResult};
pub use register::{Register, RegisterValue};
