use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for IEC 62056-21 readout operations
#[derive(Error, Debug)]
pub enum IecError {
    #[error("Port unavailable: {0}")]
    PortUnavailable(String),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("No response from meter")]
    NoResponse,

    #[error("Timeout")]
    Timeout,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Checksum mismatch: {0}")]
    ChecksumError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl IecError {
    /// Classify this error for the facade boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IecError::PortUnavailable(_) => ErrorKind::PortUnavailable,
            IecError::Connection(_) => ErrorKind::Connection,
            IecError::NoResponse => ErrorKind::NoResponse,
            IecError::Timeout => ErrorKind::Timeout,
            IecError::MalformedFrame(_) => ErrorKind::MalformedFrame,
            IecError::ChecksumError(_) => ErrorKind::ChecksumError,
            IecError::InvalidData(_) => ErrorKind::MalformedFrame,
        }
    }
}

/// Error classification reported to callers of the session facade
///
/// Every failed readout is reported as one of these kinds together with a
/// detail string. Partial register parses are not an error kind: they
/// accompany a successful result as a skipped-line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Port cannot be opened or reconfigured, or is held by another session
    PortUnavailable,
    /// Transport-level I/O fault (failed or partial write, stream dropped)
    Connection,
    /// Meter stayed silent during the handshake
    NoResponse,
    /// Meter stopped responding mid-exchange
    Timeout,
    /// Block delimiters not found in the received bytes
    MalformedFrame,
    /// Frame received but the block check character does not match
    ChecksumError,
}

/// Result type alias for IEC 62056-21 readout operations
pub type IecResult<T> = Result<T, IecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            IecError::PortUnavailable("/dev/ttyUSB0".to_string()).kind(),
            ErrorKind::PortUnavailable
        );
        assert_eq!(IecError::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(IecError::NoResponse.kind(), ErrorKind::NoResponse);
        assert_eq!(
            IecError::ChecksumError("0x12 != 0x21".to_string()).kind(),
            ErrorKind::ChecksumError
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: IecError = io.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
