//! Identification message parsing
//!
//! The meter answers the request with `/XXXZident<CR><LF>`: a three-letter
//! manufacturer code, the rate character proposing a baud switch, and a
//! free-form model identifier.

use crate::frame::{CR, LF};
use iec_core::{BaudRate, IecError, IecResult};

/// The meter's self-reported identity, captured during the identify phase
///
/// Owned by the exchange for the lifetime of one session and discarded after
/// the baud switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub manufacturer: String,
    pub rate_char: char,
    /// Proposed rate; `None` when the rate character is outside '0'..='6',
    /// in which case the session stays at the lowest safe rate
    pub proposed_baud: Option<BaudRate>,
    pub model: String,
}

impl Identification {
    /// Parse one identification line as received, terminator included
    pub fn parse(line: &[u8]) -> IecResult<Self> {
        let trimmed: &[u8] = match line {
            [rest @ .., CR, LF] => rest,
            [rest @ .., LF] => rest,
            other => other,
        };

        if trimmed.first() != Some(&b'/') {
            return Err(IecError::MalformedFrame(format!(
                "Identification does not start with '/': {:?}",
                String::from_utf8_lossy(trimmed)
            )));
        }
        if trimmed.len() < 5 {
            return Err(IecError::MalformedFrame(format!(
                "Identification too short: {:?}",
                String::from_utf8_lossy(trimmed)
            )));
        }

        let manufacturer = String::from_utf8_lossy(&trimmed[1..4]).to_string();
        if !manufacturer.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(IecError::MalformedFrame(format!(
                "Invalid manufacturer code: {:?}",
                manufacturer
            )));
        }

        let rate_char = trimmed[4] as char;
        let proposed_baud = BaudRate::from_rate_char(rate_char);
        if proposed_baud.is_none() {
            log::warn!(
                "Unrecognized rate character {:?}, will stay at {} baud",
                rate_char,
                BaudRate::MIN
            );
        }

        let model = String::from_utf8_lossy(&trimmed[5..]).to_string();

        Ok(Self {
            manufacturer,
            rate_char,
            proposed_baud,
            model,
        })
    }
}
