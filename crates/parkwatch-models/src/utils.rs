//! Numeric and serde helpers shared by the row types.

use serde::{Deserialize, Deserializer};

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid persisting "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Accept `true`/`false` in any case plus `1`/`0`.
///
/// Corpora exported by pandas carry `True`/`False`.
pub fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.0816496580927726, 6), 0.08165);
        assert_eq!(round_to(33.333333, 2), 33.33);
        assert_eq!(round_to(2.0 / 3.0 * 100.0, 2), 66.67);
        assert_eq!(round_to(-0.0000001, 6), 0.0);
    }

    #[test]
    fn test_lenient_bool() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_lenient_bool")]
            flag: bool,
        }
        let row: Row = serde_json::from_str(r#"{"flag":"True"}"#).unwrap();
        assert!(row.flag);
        let row: Row = serde_json::from_str(r#"{"flag":"0"}"#).unwrap();
        assert!(!row.flag);
        assert!(serde_json::from_str::<Row>(r#"{"flag":"maybe"}"#).is_err());
    }
}
