//! Typed argument values
//!
//! Every argument crosses the wire as a `(tag, text)` pair. [`ArgValue`] owns
//! both directions of that mapping so callers never build the parallel
//! `argTypes`/`args` arrays by hand.
//!
//! | variant        | tag                | text                                   |
//! |----------------|--------------------|----------------------------------------|
//! | `Str`          | `string`           | verbatim                               |
//! | `Int`          | `integer`          | decimal                                |
//! | `Float`        | `number`           | decimal, `NaN`, `Infinity`, `-Infinity` |
//! | `Float(5e-324)`| `Number.MIN_VALUE` | `Number.MIN_VALUE`                     |
//! | `Bytes`        | `Uint8Array`       | comma separated decimal bytes          |
//! | `Bool`         | `Boolean`          | `true` / `false`                       |

use crate::error::CoercionError;
use std::fmt;
use std::str::FromStr;

/// Smallest positive representable `f64` (a subnormal), carried by its own tag
pub const MIN_NUMBER: f64 = 5e-324;

/// Wire type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgTag {
    String,
    Integer,
    Number,
    MinNumber,
    Bytes,
    Boolean,
}

impl ArgTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArgTag::String => "string",
            ArgTag::Integer => "integer",
            ArgTag::Number => "number",
            ArgTag::MinNumber => "Number.MIN_VALUE",
            ArgTag::Bytes => "Uint8Array",
            ArgTag::Boolean => "Boolean",
        }
    }
}

impl FromStr for ArgTag {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ArgTag::String),
            "integer" => Ok(ArgTag::Integer),
            "number" => Ok(ArgTag::Number),
            "Number.MIN_VALUE" => Ok(ArgTag::MinNumber),
            "Uint8Array" => Ok(ArgTag::Bytes),
            "Boolean" => Ok(ArgTag::Boolean),
            other => Err(CoercionError::unknown_tag(other, "")),
        }
    }
}

impl fmt::Display for ArgTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single positional argument or return value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Bool(bool),
}

impl ArgValue {
    /// Tag this value is written with
    pub fn tag(&self) -> ArgTag {
        match self {
            ArgValue::Str(_) => ArgTag::String,
            ArgValue::Int(_) => ArgTag::Integer,
            ArgValue::Float(v) if v.to_bits() == MIN_NUMBER.to_bits() => ArgTag::MinNumber,
            ArgValue::Float(_) => ArgTag::Number,
            ArgValue::Bytes(_) => ArgTag::Bytes,
            ArgValue::Bool(_) => ArgTag::Boolean,
        }
    }

    /// Textual form written into `args`
    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Str(s) => s.clone(),
            ArgValue::Int(v) => v.to_string(),
            ArgValue::Float(v) => format_number(*v),
            ArgValue::Bytes(bytes) => bytes
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(","),
            ArgValue::Bool(v) => v.to_string(),
        }
    }

    /// Split into the `(argType, arg)` pair carried by an envelope
    pub fn to_wire(&self) -> (String, String) {
        (self.tag().as_str().to_string(), self.to_text())
    }

    /// Rebuild a value from its wire pair
    pub fn from_wire(tag: &str, text: &str) -> Result<Self, CoercionError> {
        let tag = ArgTag::from_str(tag).map_err(|_| CoercionError::unknown_tag(tag, text))?;
        Self::coerce(tag, text)
    }

    /// Coerce text according to a known tag
    pub fn coerce(tag: ArgTag, text: &str) -> Result<Self, CoercionError> {
        match tag {
            ArgTag::String => Ok(ArgValue::Str(text.to_string())),
            ArgTag::Integer => text
                .trim()
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|e| CoercionError::new(tag.as_str(), text, e.to_string())),
            ArgTag::Number => parse_number(text)
                .map(ArgValue::Float)
                .ok_or_else(|| CoercionError::new(tag.as_str(), text, "not a number")),
            ArgTag::MinNumber => Ok(ArgValue::Float(MIN_NUMBER)),
            ArgTag::Bytes => parse_bytes(text)
                .map(ArgValue::Bytes)
                .map_err(|reason| CoercionError::new(tag.as_str(), text, reason)),
            ArgTag::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err(CoercionError::new(tag.as_str(), text, "expected 'true' or 'false'")),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ArgValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag(), self.to_text())
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(v: Vec<u8>) -> Self {
        ArgValue::Bytes(v)
    }
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if v.to_bits() == MIN_NUMBER.to_bits() {
        ArgTag::MinNumber.as_str().to_string()
    } else {
        // `{:?}` keeps exponents for very large and very small magnitudes
        format!("{:?}", v)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    match text.trim() {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "Number.MIN_VALUE" => Some(MIN_NUMBER),
        "" => None,
        other => {
            let lower = other.to_ascii_lowercase();
            // Reject Rust-only spellings such as "inf" so both peers agree
            if lower.contains("inf") || lower.contains("nan") {
                return None;
            }
            other.parse::<f64>().ok()
        }
    }
}

fn parse_bytes(text: &str) -> Result<Vec<u8>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .enumerate()
        .map(|(i, part)| {
            part.trim()
                .parse::<u8>()
                .map_err(|e| format!("element {} ({:?}): {}", i, part, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn through_wire(value: &ArgValue) -> ArgValue {
        let (tag, text) = value.to_wire();
        ArgValue::from_wire(&tag, &text).unwrap()
    }

    #[test]
    fn test_string_passthrough_keeps_utf8() {
        let value = ArgValue::from("键值 ✓ value");
        assert_eq!(through_wire(&value), value);
    }

    #[test]
    fn test_integer_and_float_are_distinct() {
        assert_eq!(through_wire(&ArgValue::Int(1)), ArgValue::Int(1));
        assert_eq!(through_wire(&ArgValue::Float(1.0)), ArgValue::Float(1.0));
        assert_eq!(through_wire(&ArgValue::Float(1.1)), ArgValue::Float(1.1));
        assert_eq!(ArgValue::Int(i64::MIN).to_wire().0, "integer");
    }

    #[test]
    fn test_special_numbers() {
        assert!(through_wire(&ArgValue::Float(f64::NAN))
            .as_f64()
            .unwrap()
            .is_nan());
        assert_eq!(
            through_wire(&ArgValue::Float(f64::INFINITY)),
            ArgValue::Float(f64::INFINITY)
        );
        assert_eq!(
            through_wire(&ArgValue::Float(f64::NEG_INFINITY)),
            ArgValue::Float(f64::NEG_INFINITY)
        );
        assert_eq!(ArgValue::Float(f64::NAN).to_text(), "NaN");
        assert_eq!(ArgValue::Float(f64::NEG_INFINITY).to_text(), "-Infinity");
    }

    #[test]
    fn test_min_value_uses_sentinel_tag() {
        let value = ArgValue::Float(MIN_NUMBER);
        let (tag, text) = value.to_wire();
        assert_eq!(tag, "Number.MIN_VALUE");
        assert_eq!(text, "Number.MIN_VALUE");
        assert_eq!(through_wire(&value).as_f64().unwrap().to_bits(), 1);
    }

    #[test]
    fn test_extreme_magnitudes_survive() {
        for v in [f64::MAX, f64::MIN_POSITIVE, -1e-300, 1e300, -0.0] {
            let back = through_wire(&ArgValue::Float(v)).as_f64().unwrap();
            assert_eq!(back.to_bits(), v.to_bits(), "value {:?}", v);
        }
    }

    #[test]
    fn test_false_is_not_truthy() {
        assert_eq!(
            ArgValue::from_wire("Boolean", "false").unwrap(),
            ArgValue::Bool(false)
        );
        assert_eq!(
            ArgValue::from_wire("Boolean", "TRUE").unwrap(),
            ArgValue::Bool(true)
        );
        assert!(ArgValue::from_wire("Boolean", "yes").is_err());
        assert!(ArgValue::from_wire("Boolean", "").is_err());
    }

    #[test]
    fn test_bytes_from_comma_list() {
        assert_eq!(
            ArgValue::from_wire("Uint8Array", "1, 2,255").unwrap(),
            ArgValue::Bytes(vec![1, 2, 255])
        );
        assert_eq!(
            ArgValue::from_wire("Uint8Array", "").unwrap(),
            ArgValue::Bytes(Vec::new())
        );
        let err = ArgValue::from_wire("Uint8Array", "1,256").unwrap_err();
        assert!(err.reason.contains("element 1"));
    }

    #[test]
    fn test_number_accepts_plain_integers() {
        assert_eq!(
            ArgValue::from_wire("number", "7").unwrap(),
            ArgValue::Float(7.0)
        );
    }

    #[test]
    fn test_number_rejects_garbage_and_rust_spellings() {
        assert!(ArgValue::from_wire("number", "abc").is_err());
        assert!(ArgValue::from_wire("number", "inf").is_err());
        assert!(ArgValue::from_wire("number", "").is_err());
        assert!(ArgValue::from_wire("integer", "1.5").is_err());
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = ArgValue::from_wire("Date", "2020-01-01").unwrap_err();
        assert_eq!(err.tag, "Date");
        assert_eq!(err.reason, "unknown type tag");
    }
}
