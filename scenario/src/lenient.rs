//! Forgiving deserializers for untrusted JSON.
//!
//! Use with `#[serde(default, deserialize_with = "lenient::...")]`. Numbers
//! may arrive as numeric strings; `null` and any other type mismatch become
//! the field's zero value instead of an error.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Floating point number, `0.0` when absent or unreadable.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value).unwrap_or_default())
}

/// Signed integer, rounding fractional input.
pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::Number(n) = &value
        && let Some(i) = n.as_i64()
    {
        return Ok(i);
    }
    Ok(number_of(&value).map(|n| n.round() as i64).unwrap_or_default())
}

/// Non-negative count, negatives clamp to `0`.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::Number(n) = &value
        && let Some(u) = n.as_u64()
    {
        return Ok(u);
    }
    Ok(number_of(&value)
        .filter(|n| *n > 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or_default())
}

/// Like [`count`], saturating at `u32::MAX`.
pub fn count_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    count(deserializer).map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// String, empty for anything that is not a JSON string.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// List of strings; non-string elements are dropped, non-arrays become empty.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Boolean, also accepting `"true"` / `"false"` strings.
pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
        _ => Ok(false),
    }
}

/// Nested object, falling back to `T::default()` when the value does not fit.
pub fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_default())
}
