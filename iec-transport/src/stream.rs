//! Link accessor trait for the physical meter connection

use async_trait::async_trait;
use iec_core::{BaudRate, IecError, IecResult};
use std::time::Duration;

/// Byte-level access to one meter link
///
/// The only component of the engine with externally observable side effects.
/// Every read is bounded by the timeout set via [`set_timeout`]: the meter may
/// never answer, or stop answering mid-block, and both must terminate the call
/// rather than block indefinitely.
///
/// [`set_timeout`]: MeterLink::set_timeout
#[async_trait]
pub trait MeterLink: Send {
    /// Open the link
    ///
    /// Claims the port exclusively for this session. A second open while a
    /// handle is outstanding fails with `PortUnavailable`.
    async fn open(&mut self) -> IecResult<()>;

    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> IecResult<()>;

    /// Read data from the link
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if the stream has closed. Fails with
    /// `Timeout` when the configured window elapses without data.
    async fn read(&mut self, buf: &mut [u8]) -> IecResult<usize>;

    /// Write data to the link
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> IecResult<usize>;

    /// Write all data to the link; a partial write is an error
    async fn write_all(&mut self, buf: &[u8]) -> IecResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(IecError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered output
    async fn flush(&mut self) -> IecResult<()>;

    /// Reconfigure the open link to a new line rate
    async fn set_baud_rate(&mut self, baud: BaudRate) -> IecResult<()>;

    /// Check if the link is closed
    fn is_closed(&self) -> bool;

    /// Close the link and release the port claim; idempotent
    async fn close(&mut self) -> IecResult<()>;

    /// Read bytes until `delimiter` is observed, inclusive
    ///
    /// Each underlying read carries the configured timeout. Fails with
    /// `MalformedFrame` when `max_len` bytes arrive without the delimiter.
    async fn read_until(&mut self, delimiter: u8, max_len: usize) -> IecResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.read(&mut byte).await?;
            if n == 0 {
                return Err(IecError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Stream closed while waiting for delimiter",
                )));
            }
            out.push(byte[0]);
            if byte[0] == delimiter {
                return Ok(out);
            }
            if out.len() >= max_len {
                return Err(IecError::MalformedFrame(format!(
                    "No 0x{:02X} delimiter within {} bytes",
                    delimiter, max_len
                )));
            }
        }
    }
}
