//! Serial port link implementation

use crate::port_guard::{self, PortClaim};
use crate::stream::MeterLink;
use async_trait::async_trait;
use iec_core::{BaudRate, IecError, IecResult};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialStream};

/// Serial port settings for the optical meter link
///
/// IEC 62056-21 exchanges run 7E1 by default; some meters are wired 8N1
/// behind converters, so the framing stays configurable.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: BaudRate,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with the protocol's 7E1 default framing
    pub fn new(port_name: String, baud_rate: BaudRate) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Seven,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::Even,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(Duration::from_secs(3)),
        }
    }

    /// Create serial settings with caller-supplied framing
    ///
    /// Invalid framing values fall back to the 7E1 defaults with a warning
    /// rather than failing; a conservative framing is always usable.
    pub fn with_framing(
        port_name: String,
        baud_rate: BaudRate,
        bytesize: u8,
        parity: char,
        stopbits: u8,
    ) -> Self {
        let mut settings = Self::new(port_name, baud_rate);

        settings.data_bits = match bytesize {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            8 => tokio_serial::DataBits::Eight,
            other => {
                log::warn!("Invalid bytesize {}, defaulting to 7", other);
                tokio_serial::DataBits::Seven
            }
        };

        settings.parity = match parity.to_ascii_uppercase() {
            'N' => tokio_serial::Parity::None,
            'E' => tokio_serial::Parity::Even,
            'O' => tokio_serial::Parity::Odd,
            other => {
                log::warn!("Invalid parity {:?}, defaulting to even", other);
                tokio_serial::Parity::Even
            }
        };

        settings.stop_bits = match stopbits {
            1 => tokio_serial::StopBits::One,
            2 => tokio_serial::StopBits::Two,
            other => {
                log::warn!("Invalid stopbits {}, defaulting to 1", other);
                tokio_serial::StopBits::One
            }
        };

        settings
    }
}

/// Serial port meter link
///
/// Owns the physical session: the stream handle and the exclusivity claim on
/// the port path. Both are released on close and on drop.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    claim: Option<PortClaim>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial link; the port is not touched until `open()`
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            claim: None,
            settings,
            closed: true,
        }
    }

    fn stream_mut(&mut self) -> IecResult<&mut SerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            IecError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.settings.port_name)
            .field("baud", &self.settings.baud_rate)
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl MeterLink for SerialTransport {
    async fn open(&mut self) -> IecResult<()> {
        if !self.closed {
            return Err(IecError::PortUnavailable(format!(
                "{} has already been opened",
                self.settings.port_name
            )));
        }

        let claim = port_guard::claim(&self.settings.port_name)?;

        let builder = tokio_serial::new(
            &self.settings.port_name,
            self.settings.baud_rate.bits_per_second(),
        )
        .data_bits(self.settings.data_bits)
        .stop_bits(self.settings.stop_bits)
        .parity(self.settings.parity)
        .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            IecError::PortUnavailable(format!(
                "Failed to open {}: {}",
                self.settings.port_name, e
            ))
        })?;

        log::debug!(
            "Opened {} at {} baud",
            self.settings.port_name,
            self.settings.baud_rate
        );
        self.stream = Some(stream);
        self.claim = Some(claim);
        self.closed = false;
        Ok(())
    }

    async fn set_timeout(&mut self, timeout: Option<Duration>) -> IecResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> IecResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| IecError::Timeout)?
                .map_err(IecError::Connection)
        } else {
            stream.read(buf).await.map_err(IecError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> IecResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| IecError::Timeout)?
                .map_err(IecError::Connection)
        } else {
            stream.write(buf).await.map_err(IecError::Connection)
        }
    }

    async fn flush(&mut self) -> IecResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(IecError::Connection)
    }

    async fn set_baud_rate(&mut self, baud: BaudRate) -> IecResult<()> {
        let port_name = self.settings.port_name.clone();
        let stream = self.stream_mut()?;
        stream.set_baud_rate(baud.bits_per_second()).map_err(|e| {
            IecError::PortUnavailable(format!(
                "Failed to switch {} to {} baud: {}",
                port_name, baud, e
            ))
        })?;
        log::debug!("Switched {} to {} baud", port_name, baud);
        self.settings.baud_rate = baud;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> IecResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
            log::debug!("Closed {}", self.settings.port_name);
        }
        self.claim = None;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_settings_defaults() {
        let settings = SerialSettings::new("/dev/ttyUSB0".to_string(), BaudRate::B300);
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.data_bits, tokio_serial::DataBits::Seven);
        assert_eq!(settings.parity, tokio_serial::Parity::Even);
        assert_eq!(settings.stop_bits, tokio_serial::StopBits::One);
    }

    #[test]
    fn test_invalid_framing_falls_back() {
        let settings =
            SerialSettings::with_framing("/dev/ttyUSB0".to_string(), BaudRate::B300, 9, 'X', 3);
        assert_eq!(settings.data_bits, tokio_serial::DataBits::Seven);
        assert_eq!(settings.parity, tokio_serial::Parity::Even);
        assert_eq!(settings.stop_bits, tokio_serial::StopBits::One);
    }

    #[tokio::test]
    async fn test_open_missing_port_is_unavailable() {
        let mut link = SerialTransport::new(SerialSettings::new(
            "/dev/ttyNOSUCH".to_string(),
            BaudRate::B300,
        ));
        let err = link.open().await.unwrap_err();
        assert_eq!(err.kind(), iec_core::ErrorKind::PortUnavailable);
        // A failed open leaves no claim behind
        let reclaim = port_guard::claim("/dev/ttyNOSUCH").unwrap();
        drop(reclaim);
    }
}
