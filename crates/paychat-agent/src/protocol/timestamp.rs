//! `ts` arrives as an ISO-8601 string or an epoch number. Anything else
//! decodes to `None` and the caller stamps local time.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(f64),
    Other(IgnoredAny),
}

/// Epoch values below this are taken as seconds, at or above as milliseconds.
const MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    raw.parse::<f64>().ok().and_then(from_epoch)
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value < MILLIS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawTimestamp::Text(text) => parse_timestamp(&text),
        RawTimestamp::Number(n) => from_epoch(n),
        RawTimestamp::Other(_) => None,
    }))
}
