//! Lenient duration fields.
//!
//! TTLs are accepted as integer seconds or as strings such as `"300"`,
//! `"90s"`, `"5m"`, `"2h"` or `"1d"`.

use serde::{Deserialize, Deserializer};

/// Longest duration any TTL may express, roughly a century.
pub const MAX_DURATION_SECONDS: u64 = 100 * 365 * 24 * 3600;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

/// Parse a duration string into whole seconds.
pub fn parse_seconds(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", raw))?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(format!("invalid duration unit in '{}'", raw)),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{}' is too large", raw))
}

/// `deserialize_with` target for `Option<u64>` second fields.
pub fn deserialize_opt_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => Ok(Some(secs)),
        Some(RawDuration::Text(text)) => parse_seconds(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
