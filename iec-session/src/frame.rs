//! Frame encoding, block extraction and checksum validation
//!
//! The codec is pure transformation: it builds the request and
//! acknowledgement lines and validates received data blocks, but performs no
//! I/O itself.

use crate::bcc::{BccCalc, ChecksumKind};
use iec_core::{IecError, IecResult};

/// Start of header
pub const SOH: u8 = 0x01;
/// Start of text; opens a framed data block
pub const STX: u8 = 0x02;
/// End of text; closes a framed data block, followed by the BCC
pub const ETX: u8 = 0x03;
/// End of transmission
pub const EOT: u8 = 0x04;
/// Acknowledge; opens the baud-rate option select message
pub const ACK: u8 = 0x06;
/// Negative acknowledge
pub const NAK: u8 = 0x15;
/// Carriage return
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;
/// Readout end marker preceding the final CR LF
pub const END_MARKER: u8 = b'!';

/// Build the request message that opens a session
///
/// `/?!<CR><LF>` in the wildcard case; the optional device address is placed
/// between the query code and the terminator so a multi-drop bus can select
/// one station.
pub fn encode_request(query_code: &str, device_address: Option<&str>) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.push(b'/');
    out.extend_from_slice(query_code.as_bytes());
    if let Some(address) = device_address {
        out.extend_from_slice(address.as_bytes());
    }
    out.push(END_MARKER);
    out.push(CR);
    out.push(LF);
    out
}

/// Build the option select message acknowledging a proposed rate
///
/// `ACK '0' Z '0' CR LF`: protocol control "normal", the rate character being
/// acknowledged, mode control "data readout".
pub fn encode_ack(rate_char: char) -> Vec<u8> {
    vec![ACK, b'0', rate_char as u8, b'0', CR, LF]
}

/// A framed data block as received: checksummed bytes plus the trailing BCC
///
/// `checked` holds everything the block check character covers: the bytes
/// after STX up to and including ETX. Transient: consumed by validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    checked: Vec<u8>,
    bcc: u8,
}

impl RawFrame {
    /// Locate the STX/ETX envelope and the trailing check character
    ///
    /// Fails with `MalformedFrame` when either delimiter is missing or the
    /// check character after ETX has not arrived.
    pub fn extract(bytes: &[u8]) -> IecResult<Self> {
        let stx = bytes
            .iter()
            .position(|&b| b == STX)
            .ok_or_else(|| IecError::MalformedFrame("STX not found".to_string()))?;
        let etx_rel = bytes[stx + 1..]
            .iter()
            .position(|&b| b == ETX)
            .ok_or_else(|| IecError::MalformedFrame("ETX not found".to_string()))?;
        let etx = stx + 1 + etx_rel;
        let bcc = *bytes
            .get(etx + 1)
            .ok_or_else(|| IecError::MalformedFrame("Frame truncated before BCC".to_string()))?;

        Ok(Self {
            checked: bytes[stx + 1..=etx].to_vec(),
            bcc,
        })
    }

    /// The check character as received
    pub fn received_bcc(&self) -> u8 {
        self.bcc
    }

    /// Recompute the checksum and compare against the received value
    ///
    /// A mismatch is terminal for the read; the block is discarded, never
    /// auto-corrected. The failure detail carries a hex dump of the frame
    /// when debug logging is enabled, otherwise only the two checksum bytes.
    pub fn validate(self, kind: ChecksumKind) -> IecResult<ValidatedBlock> {
        let mut calc = BccCalc::new(kind);
        calc.update_bytes(&self.checked);

        if calc.value() != self.bcc {
            let mut detail = format!(
                "computed 0x{:02X}, received 0x{:02X} ({:?})",
                calc.value(),
                self.bcc,
                kind
            );
            if log::log_enabled!(log::Level::Debug) {
                let dump: String = self.checked.iter().map(|b| format!("{:02X} ", b)).collect();
                detail.push_str(&format!("; frame: {}", dump.trim_end()));
            }
            log::warn!("Data block rejected: {}", detail);
            return Err(IecError::ChecksumError(detail));
        }

        // Strip the trailing ETX; payload lines only
        let mut payload = self.checked;
        payload.pop();
        Ok(ValidatedBlock(payload))
    }
}

/// Data block whose checksum has been verified (or that carries none on the
/// wire, for bare readouts)
///
/// The register parser only ever sees blocks through this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlock(Vec<u8>);

impl ValidatedBlock {
    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the payload bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Extract an unframed readout terminated by the `!` end marker
///
/// Meters in modes A/B, and some mode C firmwares, send the data lines
/// without the STX/ETX envelope; there is no check character on the wire in
/// that shape.
pub fn extract_bare_readout(bytes: &[u8]) -> IecResult<ValidatedBlock> {
    let end = bytes
        .iter()
        .position(|&b| b == END_MARKER)
        .ok_or_else(|| IecError::MalformedFrame("Readout end marker not found".to_string()))?;
    Ok(ValidatedBlock(bytes[..end].to_vec()))
}

/// Whether the received bytes form a complete data block
///
/// Framed: ETX observed with at least one byte (the BCC) after it.
/// Bare: the `!` end marker followed by CR LF.
pub fn readout_complete(bytes: &[u8]) -> bool {
    if bytes.contains(&STX) {
        match bytes.iter().position(|&b| b == ETX) {
            Some(etx) => bytes.len() > etx + 1,
            None => false,
        }
    } else {
        bytes.ends_with(&[END_MARKER, CR, LF]) || bytes.ends_with(&[END_MARKER])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payload: &[u8], kind: ChecksumKind) -> Vec<u8> {
        let mut calc = BccCalc::new(kind);
        calc.update_bytes(payload);
        calc.update(ETX);
        let mut out = vec![STX];
        out.extend_from_slice(payload);
        out.push(ETX);
        out.push(calc.value());
        out
    }

    #[test]
    fn test_encode_request_wildcard() {
        assert_eq!(encode_request("?", None), b"/?!\r\n");
    }

    #[test]
    fn test_encode_request_with_address() {
        assert_eq!(encode_request("?", Some("01")), b"/?01!\r\n");
    }

    #[test]
    fn test_encode_ack() {
        assert_eq!(encode_ack('5'), vec![ACK, b'0', b'5', b'0', CR, LF]);
    }

    #[test]
    fn test_extract_and_validate() {
        let wire = framed(b"1.8.0(001234.5*kWh)\r\n!\r\n", ChecksumKind::Xor);
        let frame = RawFrame::extract(&wire).unwrap();
        let block = frame.validate(ChecksumKind::Xor).unwrap();
        assert_eq!(block.as_bytes(), b"1.8.0(001234.5*kWh)\r\n!\r\n");
    }

    #[test]
    fn test_flipped_bcc_is_rejected() {
        let mut wire = framed(b"1.8.0(001234.5*kWh)\r\n!\r\n", ChecksumKind::Xor);
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        let frame = RawFrame::extract(&wire).unwrap();
        let err = frame.validate(ChecksumKind::Xor).unwrap_err();
        assert_eq!(err.kind(), iec_core::ErrorKind::ChecksumError);
    }

    #[test]
    fn test_mod256_strategy() {
        let wire = framed(b"0.0.0(12345678)\r\n!\r\n", ChecksumKind::Mod256);
        let frame = RawFrame::extract(&wire).unwrap();
        // Validating with the wrong strategy must fail, the right one pass
        assert!(frame.clone().validate(ChecksumKind::Xor).is_err());
        assert!(frame.validate(ChecksumKind::Mod256).is_ok());
    }

    #[test]
    fn test_missing_delimiters() {
        assert!(RawFrame::extract(b"no frame here").is_err());
        let mut wire = vec![STX];
        wire.extend_from_slice(b"half a block");
        assert!(RawFrame::extract(&wire).is_err());
    }

    #[test]
    fn test_truncated_before_bcc() {
        let mut wire = framed(b"x\r\n", ChecksumKind::Xor);
        wire.pop();
        let err = RawFrame::extract(&wire).unwrap_err();
        assert_eq!(err.kind(), iec_core::ErrorKind::MalformedFrame);
    }

    #[test]
    fn test_bare_readout() {
        let block = extract_bare_readout(b"1.8.0(42*kWh)\r\n!\r\n").unwrap();
        assert_eq!(block.as_bytes(), b"1.8.0(42*kWh)\r\n");
        assert!(extract_bare_readout(b"1.8.0(42*kWh)\r\n").is_err());
    }

    #[test]
    fn test_readout_complete() {
        let wire = framed(b"a\r\n!\r\n", ChecksumKind::Xor);
        assert!(readout_complete(&wire));
        assert!(!readout_complete(&wire[..wire.len() - 1]));
        assert!(readout_complete(b"1.8.0(1)\r\n!\r\n"));
        assert!(!readout_complete(b"1.8.0(1)\r\n"));
    }
}
