//! Coercion of loosely-typed JSON values into scalars
//!
//! Callers send numbers as JSON numbers, numeric strings or single-element
//! arrays. These helpers unwrap all of those and never fail: anything that
//! cannot be converted yields `None` or the supplied default.

use serde_json::Value;

/// Unwrap single-element arrays down to the inner scalar
fn unwrap_scalar(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 => unwrap_scalar(&items[0]),
        other => other,
    }
}

/// Convert to a finite f64 if possible
pub fn as_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match unwrap_scalar(value?) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Convert to a string if the value is a scalar
pub fn as_text(value: Option<&Value>) -> Option<String> {
    match unwrap_scalar(value?) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn number_or(value: Option<&Value>, default: f64) -> f64 {
    as_number(value).unwrap_or(default)
}

pub fn text_or(value: Option<&Value>, default: &str) -> String {
    as_text(value).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_shapes() {
        assert_eq!(as_number(Some(&json!(85))), Some(85.0));
        assert_eq!(as_number(Some(&json!("85.5"))), Some(85.5));
        assert_eq!(as_number(Some(&json!(" 12 "))), Some(12.0));
        assert_eq!(as_number(Some(&json!([3]))), Some(3.0));
        assert_eq!(as_number(Some(&json!([["7"]]))), Some(7.0));
    }

    #[test]
    fn test_number_rejects() {
        assert_eq!(as_number(None), None);
        assert_eq!(as_number(Some(&json!(null))), None);
        assert_eq!(as_number(Some(&json!("abc"))), None);
        assert_eq!(as_number(Some(&json!([1, 2]))), None);
        assert_eq!(as_number(Some(&json!(true))), None);
        assert_eq!(as_number(Some(&json!("NaN"))), None);
        assert_eq!(as_number(Some(&json!("inf"))), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(number_or(Some(&json!({"x": 1})), 50.0), 50.0);
        assert_eq!(text_or(None, ""), "");
        assert_eq!(text_or(Some(&json!(["Fiber optic"])), ""), "Fiber optic");
        assert_eq!(text_or(Some(&json!({})), "N/A"), "N/A");
    }
}
