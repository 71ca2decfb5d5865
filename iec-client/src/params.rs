//! Connection parameters and builder
//!
//! Parameters are caller-owned and read-only to the engine: one value
//! describes one meter hookup and can be persisted by the host.

use iec_core::{BaudRate, IecError, IecResult};
use iec_session::{ChecksumKind, ExchangeConfig, ProtocolTiming};
use serde::{Deserialize, Serialize};

/// Everything needed to read one meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Serial port path, e.g. `/dev/ttyUSB0`
    pub port: String,
    /// Station address for multi-drop buses; wildcard when absent
    pub device_address: Option<String>,
    /// Query code placed after the '/' of the request
    pub query_code: String,
    /// Rate of the opening handshake
    pub initial_baud: BaudRate,
    /// Upper bound on the negotiated rate
    pub max_baud: BaudRate,
    /// Serial framing: data bits (protocol default 7)
    pub bytesize: u8,
    /// Serial framing: parity character, 'N'/'E'/'O' (protocol default 'E')
    pub parity: char,
    /// Serial framing: stop bits (protocol default 1)
    pub stopbits: u8,
    /// Block check algorithm of framed readouts
    pub checksum: ChecksumKind,
    /// Listen without requesting; for meters that push their readout
    pub passive: bool,
    pub timing: ProtocolTiming,
}

impl ConnectionParameters {
    /// Start building parameters for one port
    pub fn builder(port: impl Into<String>) -> ParametersBuilder {
        ParametersBuilder::new(port)
    }

    /// Exchange configuration for one session over these parameters
    pub(crate) fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            query_code: self.query_code.clone(),
            device_address: self.device_address.clone(),
            initial_baud: self.initial_baud,
            max_baud: self.max_baud,
            checksum: self.checksum,
            passive: self.passive,
            timing: self.timing,
        }
    }
}

/// Builder for [`ConnectionParameters`]
///
/// Defaults follow the protocol: wildcard query at 300 baud 7E1, negotiation
/// capped at 9600, XOR block check.
#[derive(Debug, Clone)]
pub struct ParametersBuilder {
    port: String,
    device_address: Option<String>,
    query_code: String,
    initial_baud: BaudRate,
    max_baud: BaudRate,
    bytesize: u8,
    parity: char,
    stopbits: u8,
    checksum: ChecksumKind,
    passive: bool,
    timing: ProtocolTiming,
}

impl ParametersBuilder {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            device_address: None,
            query_code: "?".to_string(),
            initial_baud: BaudRate::B300,
            max_baud: BaudRate::B9600,
            bytesize: 7,
            parity: 'E',
            stopbits: 1,
            checksum: ChecksumKind::default(),
            passive: false,
            timing: ProtocolTiming::default(),
        }
    }

    /// Select one station on a multi-drop bus
    pub fn device_address(mut self, address: impl Into<String>) -> Self {
        self.device_address = Some(address.into());
        self
    }

    pub fn query_code(mut self, code: impl Into<String>) -> Self {
        self.query_code = code.into();
        self
    }

    pub fn initial_baud(mut self, baud: BaudRate) -> Self {
        self.initial_baud = baud;
        self
    }

    /// Cap the rate the negotiation may switch to
    pub fn max_baud(mut self, baud: BaudRate) -> Self {
        self.max_baud = baud;
        self
    }

    /// Serial framing; invalid values fall back to 7E1 at open time
    pub fn framing(mut self, bytesize: u8, parity: char, stopbits: u8) -> Self {
        self.bytesize = bytesize;
        self.parity = parity;
        self.stopbits = stopbits;
        self
    }

    pub fn checksum(mut self, kind: ChecksumKind) -> Self {
        self.checksum = kind;
        self
    }

    /// Listen-only session: no request, no handshake, no baud switch
    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn timing(mut self, timing: ProtocolTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Validate and build the parameters
    pub fn build(self) -> IecResult<ConnectionParameters> {
        if self.port.is_empty() {
            return Err(IecError::InvalidData("Port path is empty".to_string()));
        }
        if self.max_baud < self.initial_baud {
            return Err(IecError::InvalidData(format!(
                "Maximum baud {} is below the initial rate {}",
                self.max_baud, self.initial_baud
            )));
        }
        Ok(ConnectionParameters {
            port: self.port,
            device_address: self.device_address,
            query_code: self.query_code,
            initial_baud: self.initial_baud,
            max_baud: self.max_baud,
            bytesize: self.bytesize,
            parity: self.parity,
            stopbits: self.stopbits,
            checksum: self.checksum,
            passive: self.passive,
            timing: self.timing,
        })
    }
}
