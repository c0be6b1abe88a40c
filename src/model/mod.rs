//! Record model.
//!
//! Input page records, emitted chunks and the chunk records read back by the
//! evaluator. JSON field values coming from OCR tooling are loosely typed, so
//! numbers and strings are accepted interchangeably where that happens in
//! practice.

mod chunk;
mod page;

pub use chunk::*;
pub use page::*;

use serde_json::Value;

/// Reads a non-negative integer from a JSON number or numeric string.
pub(crate) fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a label from a JSON string, number or bool. Empty strings are `None`.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_as_u32() {
        assert_eq!(value_as_u32(&json!(7)), Some(7));
        assert_eq!(value_as_u32(&json!("12")), Some(12));
        assert_eq!(value_as_u32(&json!(" 3 ")), Some(3));
        assert_eq!(value_as_u32(&json!(4.0)), Some(4));
        assert_eq!(value_as_u32(&json!(-1)), None);
        assert_eq!(value_as_u32(&json!("iv")), None);
        assert_eq!(value_as_u32(&Value::Null), None);
    }

    #[test]
    fn test_value_as_string() {
        assert_eq!(value_as_string(&json!("  علوم ")), Some("علوم".to_string()));
        assert_eq!(value_as_string(&json!(5)), Some("5".to_string()));
        assert_eq!(value_as_string(&json!("")), None);
        assert_eq!(value_as_string(&json!([1])), None);
    }
}
