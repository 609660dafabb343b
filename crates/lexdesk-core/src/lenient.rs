//! Field-level tolerance for persisted state.
//!
//! A stored blob is whatever some earlier build (or a hand edit) wrote. One
//! field that no longer fits its Rust type must not cost the user the rest of
//! the blob, so each helper here degrades a bad value to a default instead of
//! failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `T` if the value fits, otherwise `T::default()`. Covers `null`, unknown
/// enum names and values of the wrong JSON type.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Elements that do not decode are dropped; a non-array becomes empty.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A tally: integers, non-negative finite floats (truncated) and numeric
/// strings. Anything else counts as 0.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    Ok(as_f64(&value)
        .filter(|f| *f >= 0.0)
        .map(|f| f as u64)
        .unwrap_or(0))
}

/// A non-negative quantity such as hours. Anything else counts as 0.
pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value).filter(|f| *f >= 0.0).unwrap_or(0.0))
}

fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient")]
        name: String,
        #[serde(default, deserialize_with = "count")]
        n: u64,
        #[serde(default, deserialize_with = "amount")]
        hours: f64,
        #[serde(default, deserialize_with = "list")]
        tags: Vec<String>,
    }

    fn read(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_and_wrong_types_become_defaults() {
        let p = read(json!({"name": null, "n": "lots", "hours": [], "tags": "x"}));
        assert_eq!(p.name, "");
        assert_eq!(p.n, 0);
        assert_eq!(p.hours, 0.0);
        assert!(p.tags.is_empty());
    }

    #[test]
    fn numbers_are_coerced() {
        let p = read(json!({"n": 2.0, "hours": "14.5"}));
        assert_eq!(p.n, 2);
        assert_eq!(p.hours, 14.5);
        assert_eq!(read(json!({"n": -3})).n, 0);
        assert_eq!(read(json!({"n": "7"})).n, 7);
    }

    #[test]
    fn list_keeps_good_elements() {
        let p = read(json!({"tags": ["a", 1, null, "b"]}));
        assert_eq!(p.tags, vec!["a", "b"]);
    }
}
