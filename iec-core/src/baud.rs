use crate::error::{IecError, IecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serial line rate used during an IEC 62056-21 exchange
///
/// The handshake always starts at 300 baud; the meter proposes a switch to a
/// higher rate through the rate character of its identification message
/// ('0' = 300 up to '6' = 19200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaudRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
}

impl BaudRate {
    /// The lowest rate of the protocol, always readable by any meter
    pub const MIN: BaudRate = BaudRate::B300;

    /// Get the rate in bits per second
    pub fn bits_per_second(&self) -> u32 {
        match self {
            BaudRate::B300 => 300,
            BaudRate::B600 => 600,
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
        }
    }

    /// Parse a rate from bits per second
    pub fn from_bits_per_second(bps: u32) -> IecResult<Self> {
        match bps {
            300 => Ok(BaudRate::B300),
            600 => Ok(BaudRate::B600),
            1200 => Ok(BaudRate::B1200),
            2400 => Ok(BaudRate::B2400),
            4800 => Ok(BaudRate::B4800),
            9600 => Ok(BaudRate::B9600),
            19200 => Ok(BaudRate::B19200),
            _ => Err(IecError::InvalidData(format!(
                "Unsupported baud rate: {}",
                bps
            ))),
        }
    }

    /// Get the mode C rate character for this rate
    pub fn rate_char(&self) -> char {
        match self {
            BaudRate::B300 => '0',
            BaudRate::B600 => '1',
            BaudRate::B1200 => '2',
            BaudRate::B2400 => '3',
            BaudRate::B4800 => '4',
            BaudRate::B9600 => '5',
            BaudRate::B19200 => '6',
        }
    }

    /// Map a mode C rate character to a rate
    ///
    /// Returns `None` for characters outside '0'..='6'; callers fall back to
    /// 300 baud, which every meter can serve.
    pub fn from_rate_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(BaudRate::B300),
            '1' => Some(BaudRate::B600),
            '2' => Some(BaudRate::B1200),
            '3' => Some(BaudRate::B2400),
            '4' => Some(BaudRate::B4800),
            '5' => Some(BaudRate::B9600),
            '6' => Some(BaudRate::B19200),
            _ => None,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}
