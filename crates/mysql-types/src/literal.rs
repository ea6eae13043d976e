//! SQL literal rendering for MySQL.
//!
//! Statements are executed with bound parameters; these helpers produce the
//! fully-escaped textual form used for logging and dry runs. Escaping
//! follows `mysql_real_escape_string`, so the rendered text is also safe to
//! execute as-is.

use sync_core::FieldValue;

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escape the characters MySQL treats specially inside a quoted string.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out
}

/// Render a string as a single-quoted, escaped literal.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", escape_string(value))
}

/// Render a value as a literal: text quoted and escaped, numbers bare.
pub fn to_literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => quote_string(s),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Decimal(s) => s.clone(),
    }
}
