//! Field types and typed field values.
//!
//! Staged records hold nothing but strings. A schema declares, per field,
//! how that string is classified when it is written to the destination:
//! text values are quoted and escaped, numeric values are emitted bare.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a destination column.
///
/// # YAML Format
///
/// ```yaml
/// type: text      # default when omitted
/// type: integer
/// type: float
/// type: decimal
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Character data, written as a quoted string literal
    #[default]
    #[serde(alias = "string", alias = "varchar")]
    Text,

    /// 64-bit signed integer
    #[serde(alias = "int", alias = "bigint")]
    Integer,

    /// 64-bit IEEE 754 floating point
    #[serde(alias = "double")]
    Float,

    /// Exact decimal, kept as its textual digits
    #[serde(alias = "numeric")]
    Decimal,
}

impl FieldType {
    /// Whether values of this type are emitted without quote delimiters.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::Text)
    }

    /// Classify a raw staged value according to this type.
    ///
    /// Returns a human-readable reason when the value does not fit.
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue, String> {
        match self {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| format!("not an integer ({e}): {raw:?}")),
            FieldType::Float => {
                let f = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("not a float ({e}): {raw:?}"))?;
                if f.is_finite() {
                    Ok(FieldValue::Float(f))
                } else {
                    Err(format!("non-finite float: {raw:?}"))
                }
            }
            FieldType::Decimal => {
                let s = raw.trim();
                if is_decimal_literal(s) {
                    Ok(FieldValue::Decimal(s.to_string()))
                } else {
                    Err(format!("not a decimal: {raw:?}"))
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[+-]digits[.digits]` or `[+-].digits`, at least one digit overall.
fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    !(int_part.is_empty() && frac_part.is_empty()) && all_digits(int_part) && all_digits(frac_part)
}

/// A staged value after classification by its declared [`FieldType`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Decimal(_) => FieldType::Decimal,
        }
    }

    /// Text of the value without any quoting or escaping.
    pub fn to_raw_string(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Decimal(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
        }
    }
}
