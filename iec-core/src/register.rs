use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Value carried by a single register line
///
/// Meters report either a fixed-point decimal (`001234.5`) or opaque text
/// (serial numbers, status words). Numbers keep the declared decimal scaling
/// exactly: `001234.5` becomes mantissa 12345, scale 1, and nothing is
/// rounded beyond what the textual representation implies.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Number { mantissa: i64, scale: u32 },
    Text(String),
}

impl RegisterValue {
    /// Interpret a raw value field from a readout line
    ///
    /// The field is treated as a number when it is a plain decimal with an
    /// optional sign and at most one decimal point; anything else is kept as
    /// text verbatim.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(value) = Self::parse_decimal(trimmed) {
            return value;
        }
        RegisterValue::Text(trimmed.to_string())
    }

    fn parse_decimal(s: &str) -> Option<Self> {
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        if digits.is_empty() {
            return None;
        }

        let mut mantissa: i64 = 0;
        let mut scale: u32 = 0;
        let mut seen_point = false;
        let mut seen_digit = false;
        for c in digits.chars() {
            match c {
                '0'..='9' => {
                    mantissa = mantissa
                        .checked_mul(10)?
                        .checked_add((c as u8 - b'0') as i64)?;
                    if seen_point {
                        scale += 1;
                    }
                    seen_digit = true;
                }
                '.' if !seen_point => seen_point = true,
                _ => return None,
            }
        }
        if !seen_digit {
            return None;
        }

        Some(RegisterValue::Number {
            mantissa: sign * mantissa,
            scale,
        })
    }

    /// Numeric value as a float, when this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RegisterValue::Number { mantissa, scale } => {
                Some(*mantissa as f64 / 10f64.powi(*scale as i32))
            }
            RegisterValue::Text(_) => None,
        }
    }

    /// Whether this value is numeric
    pub fn is_number(&self) -> bool {
        matches!(self, RegisterValue::Number { .. })
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Number { mantissa, scale } => {
                if *scale == 0 {
                    return write!(f, "{}", mantissa);
                }
                let sign = if *mantissa < 0 { "-" } else { "" };
                let abs = mantissa.unsigned_abs();
                let divisor = 10u64.pow(*scale);
                write!(
                    f,
                    "{}{}.{:0width$}",
                    sign,
                    abs / divisor,
                    abs % divisor,
                    width = *scale as usize
                )
            }
            RegisterValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for RegisterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RegisterValue::Number { .. } => {
                // Numbers cross the host boundary as JSON numbers
                serializer.serialize_f64(self.as_f64().unwrap_or(0.0))
            }
            RegisterValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One decoded meter register: identifier, value and optional unit
///
/// The identifier is the short OBIS-like code from the readout line, e.g.
/// "1.8.0" for cumulative active energy import. Some meters append a second
/// parenthesised group with a capture date/time; it is carried verbatim in
/// `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub address: String,
    pub value: RegisterValue,
    pub unit: Option<String>,
    pub timestamp: Option<String>,
}

impl Register {
    /// Create a new register reading
    pub fn new(
        address: impl Into<String>,
        value: RegisterValue,
        unit: Option<String>,
        timestamp: Option<String>,
    ) -> Self {
        Self {
            address: address.into(),
            value,
            unit,
            timestamp,
        }
    }
}

impl Serialize for Register {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = 2;
        if self.unit.is_some() {
            fields += 1;
        }
        if self.timestamp.is_some() {
            fields += 1;
        }
        let mut state = serializer.serialize_struct("Register", fields)?;
        state.serialize_field("identifier", &self.address)?;
        state.serialize_field("value", &self.value)?;
        if let Some(unit) = &self.unit {
            state.serialize_field("unit", unit)?;
        }
        if let Some(ts) = &self.timestamp {
            state.serialize_field("timestamp", ts)?;
        }
        state.end()
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}({}*{})", self.address, self.value, unit),
            None => write!(f, "{}({})", self.address, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_preserves_scaling() {
        let v = RegisterValue::from_text("001234.5");
        assert_eq!(
            v,
            RegisterValue::Number {
                mantissa: 12345,
                scale: 1
            }
        );
        assert_eq!(v.as_f64(), Some(1234.5));
        assert_eq!(v.to_string(), "1234.5");
    }

    #[test]
    fn test_integer_value() {
        let v = RegisterValue::from_text("0042");
        assert_eq!(
            v,
            RegisterValue::Number {
                mantissa: 42,
                scale: 0
            }
        );
        assert_eq!(v.to_string(), "42");
    }

    #[test]
    fn test_negative_value() {
        let v = RegisterValue::from_text("-3.20");
        assert_eq!(
            v,
            RegisterValue::Number {
                mantissa: -320,
                scale: 2
            }
        );
        assert_eq!(v.to_string(), "-3.20");
    }

    #[test]
    fn test_text_value() {
        let v = RegisterValue::from_text("4E345127");
        assert_eq!(v, RegisterValue::Text("4E345127".to_string()));
        assert_eq!(v.as_f64(), None);
    }

    #[test]
    fn test_lone_point_is_text() {
        assert_eq!(
            RegisterValue::from_text("."),
            RegisterValue::Text(".".to_string())
        );
    }

    #[test]
    fn test_register_display() {
        let reg = Register::new(
            "1.8.0",
            RegisterValue::from_text("001234.5"),
            Some("kWh".to_string()),
            None,
        );
        assert_eq!(format!("{}", reg), "1.8.0(1234.5*kWh)");
    }
}
