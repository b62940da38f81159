//! Lenient numeric coercion for snapshot cells.

use serde_json::Value;

/// Coerce a JSON value into a finite number.
///
/// Accepts numbers and numeric strings, optionally percent-suffixed and
/// surrounded by whitespace. Everything else yields `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => coerce_str(s),
        _ => None,
    }
}

/// Coerce a raw text cell (`" 42% "`, `"-3.5"`) into a finite number.
pub fn coerce_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if digits.is_empty() {
        return None;
    }

    // `f64::from_str` also accepts "inf" and "NaN"; only plain decimals count.
    if !digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }

    digits.parse::<f64>().ok().filter(|f| f.is_finite())
}
