//! Forward conversion: FieldValue → MySQLValue
//!
//! This module implements `From<FieldValue>` for `MySQLValue`, converting
//! projected values into parameters bound to a prepared INSERT.

use mysql_async::Value;
use sync_core::FieldValue;

/// MySQL value wrapper for type-safe conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct MySQLValue(pub Value);

impl MySQLValue {
    /// Get the inner mysql_async::Value.
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Get a reference to the inner value.
    pub fn as_inner(&self) -> &Value {
        &self.0
    }
}

impl From<FieldValue> for MySQLValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => MySQLValue(Value::Bytes(s.into_bytes())),
            FieldValue::Integer(i) => MySQLValue(Value::Int(i)),
            FieldValue::Float(f) => MySQLValue(Value::Double(f)),
            // Decimal - sent as its digits so MySQL keeps the exact precision
            FieldValue::Decimal(s) => MySQLValue(Value::Bytes(s.into_bytes())),
        }
    }
}

impl From<&FieldValue> for MySQLValue {
    fn from(value: &FieldValue) -> Self {
        value.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_conversion() {
        let v: MySQLValue = FieldValue::Text("it's".into()).into();
        assert_eq!(v.into_inner(), Value::Bytes(b"it's".to_vec()));
    }

    #[test]
    fn test_integer_conversion() {
        let v: MySQLValue = FieldValue::Integer(i64::MAX).into();
        assert!(matches!(v.0, Value::Int(i64::MAX)));
    }

    #[test]
    fn test_float_conversion() {
        let v: MySQLValue = FieldValue::Float(1.25).into();
        assert!(matches!(v.as_inner(), Value::Double(f) if (*f - 1.25).abs() < f64::EPSILON));
    }

    #[test]
    fn test_decimal_keeps_digits() {
        let v: MySQLValue = (&FieldValue::Decimal("12.500".into())).into();
        assert_eq!(v.0, Value::Bytes(b"12.500".to_vec()));
    }
}
