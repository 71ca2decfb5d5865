//! Register extraction from a validated data block
//!
//! A readout block is a sequence of CR LF separated lines, each in the shape
//! `identifier(value*unit)` or `identifier(value)`, optionally followed by a
//! second parenthesised group with a capture date/time. Identifiers come
//! either as a full OBIS address (`1-0:1.8.0*255`) or already reduced to the
//! short `C.D.E` code; both reduce to the short code here.

use crate::frame::{STX, ValidatedBlock};
use iec_core::{Register, RegisterValue};
use once_cell::sync::Lazy;
use regex::Regex;

/// Full or short OBIS readout line; groups: A, B, C, D, E, value, extra
static OBIS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)-(\d+):)?(\d+)\.(\d+)\.(\d+)(?:\*\d+)?\(([^)]*)\)(?:\(([^)]*)\))?")
        .expect("OBIS line pattern is valid")
});

/// Any other `identifier(value)` line; the identifier is kept verbatim
static GENERIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^()\s]+)\(([^)]*)\)(?:\(([^)]*)\))?").expect("generic line pattern is valid")
});

/// Result of parsing one data block
///
/// `skipped` counts the lines that matched neither shape. A partial parse is
/// not a failure: one malformed register must not hide the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReadout {
    pub registers: Vec<Register>,
    pub skipped: usize,
}

/// Extract registers from a validated block, in block order
///
/// Output ordering matches the block exactly: later duplicate identifiers
/// overwrite earlier ones in downstream consumers, so order is
/// protocol-significant.
pub fn parse(block: &ValidatedBlock) -> ParsedReadout {
    let text = String::from_utf8_lossy(block.as_bytes());
    let mut registers = Vec::new();
    let mut skipped = 0usize;

    for raw_line in text.split("\r\n") {
        let line = raw_line
            .strip_prefix(STX as char)
            .unwrap_or(raw_line)
            .trim_matches(['\r', '\n']);
        if line.trim().is_empty() || line.contains('!') {
            continue;
        }

        if let Some(caps) = OBIS_LINE.captures(line) {
            // Reduce to the short C.D.E code; the medium/channel prefix and
            // the billing-period suffix select the same quantity
            let address = format!("{}.{}.{}", &caps[3], &caps[4], &caps[5]);
            registers.push(build_register(
                address,
                &caps[6],
                caps.get(7).map(|m| m.as_str()),
            ));
        } else if let Some(caps) = GENERIC_LINE.captures(line) {
            registers.push(build_register(
                caps[1].to_string(),
                &caps[2],
                caps.get(3).map(|m| m.as_str()),
            ));
        } else {
            log::debug!("Line does not match readout format: {:?}", line);
            skipped += 1;
        }
    }

    ParsedReadout { registers, skipped }
}

fn build_register(address: String, value_field: &str, extra: Option<&str>) -> Register {
    let (value_part, unit) = match value_field.split_once('*') {
        Some((value, unit)) => {
            let unit = unit.trim();
            (
                value,
                (!unit.is_empty()).then(|| unit.to_string()),
            )
        }
        None => (value_field, None),
    };
    let timestamp = extra
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Register::new(address, RegisterValue::from_text(value_part), unit, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcc::ChecksumKind;
    use crate::frame::RawFrame;

    fn block(text: &str) -> ValidatedBlock {
        crate::frame::extract_bare_readout(format!("{}!\r\n", text).as_bytes())
            .expect("test block terminated")
    }

    #[test]
    fn test_register_order_and_scaling() {
        let parsed = parse(&block("1.8.0(001234.5*kWh)\r\n2.8.0(000012.3*kWh)\r\n"));
        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.registers.len(), 2);
        assert_eq!(parsed.registers[0].address, "1.8.0");
        assert_eq!(parsed.registers[0].value.as_f64(), Some(1234.5));
        assert_eq!(parsed.registers[0].unit.as_deref(), Some("kWh"));
        assert_eq!(parsed.registers[1].address, "2.8.0");
        assert_eq!(parsed.registers[1].value.as_f64(), Some(12.3));
    }

    #[test]
    fn test_full_obis_address_reduces_to_short_code() {
        let parsed = parse(&block("1-0:1.8.1*255(000456.7*kWh)(25-01-31 23:59)\r\n"));
        assert_eq!(parsed.registers.len(), 1);
        let reg = &parsed.registers[0];
        assert_eq!(reg.address, "1.8.1");
        assert_eq!(reg.value.as_f64(), Some(456.7));
        assert_eq!(reg.timestamp.as_deref(), Some("25-01-31 23:59"));
    }

    #[test]
    fn test_broken_line_is_skipped_not_fatal() {
        let parsed = parse(&block(
            "1.8.0(001234.5*kWh)\r\ngarbage without parens\r\n2.8.0(000012.3*kWh)\r\n",
        ));
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.registers.len(), 2);
    }

    #[test]
    fn test_unknown_identifier_kept_verbatim() {
        let parsed = parse(&block("C.1.0(12345678)\r\nF.F(00000000)\r\n"));
        assert_eq!(parsed.registers.len(), 2);
        assert_eq!(parsed.registers[0].address, "C.1.0");
        assert_eq!(parsed.registers[1].address, "F.F");
        assert_eq!(
            parsed.registers[1].value,
            RegisterValue::Number {
                mantissa: 0,
                scale: 0
            }
        );
    }

    #[test]
    fn test_text_value_without_unit() {
        let parsed = parse(&block("0.0.0(4E345127  )\r\n"));
        assert_eq!(
            parsed.registers[0].value,
            RegisterValue::Text("4E345127".to_string())
        );
        assert_eq!(parsed.registers[0].unit, None);
    }

    #[test]
    fn test_end_marker_and_blank_lines_ignored() {
        let parsed = parse(&block("\r\n1.8.0(1*kWh)\r\n\r\n"));
        assert_eq!(parsed.registers.len(), 1);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_parses_framed_block_payload() {
        let payload = b"1.8.0(000100.0*kWh)\r\n!\r\n";
        let mut calc = crate::bcc::BccCalc::new(ChecksumKind::Xor);
        calc.update_bytes(payload);
        calc.update(crate::frame::ETX);
        let mut wire = vec![crate::frame::STX];
        wire.extend_from_slice(payload);
        wire.push(crate::frame::ETX);
        wire.push(calc.value());

        let validated = RawFrame::extract(&wire)
            .and_then(|f| f.validate(ChecksumKind::Xor))
            .expect("valid fixture");
        let parsed = parse(&validated);
        assert_eq!(parsed.registers.len(), 1);
        assert_eq!(parsed.registers[0].value.as_f64(), Some(100.0));
    }
}
