//! Session, tier, and usage-limit payloads.

use std::collections::BTreeMap;
use std::fmt;

use paychat_common::SessionId;
use serde::{Deserialize, Serialize};

/// A named access level governing usage ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    #[default]
    Anonymous,
    Elevated,
    Admin,
    Other(String),
}

impl Tier {
    pub fn as_str(&self) -> &str {
        match self {
            Tier::Anonymous => "anonymous",
            Tier::Elevated => "elevated",
            Tier::Admin => "admin",
            Tier::Other(name) => name,
        }
    }
}

impl From<String> for Tier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "anonymous" => Tier::Anonymous,
            "elevated" => Tier::Elevated,
            "admin" => Tier::Admin,
            _ => Tier::Other(value),
        }
    }
}

impl From<Tier> for String {
    fn from(value: Tier) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One usage counter and its ceiling. `max: None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    pub used: u64,
    pub max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in_sec: Option<u64>,
}

impl Meter {
    pub fn remaining(&self) -> Option<u64> {
        self.max.map(|max| max.saturating_sub(self.used))
    }

    pub fn is_exhausted(&self) -> bool {
        self.max.is_some_and(|max| self.used >= max)
    }

    fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Meter::default()),
            serde_json::Value::Number(_) => Some(Meter {
                used: 0,
                max: ceiling(value),
                reset_in_sec: None,
            }),
            serde_json::Value::Object(fields) => Some(Meter {
                used: fields.get("used").and_then(|v| v.as_u64()).unwrap_or(0),
                max: fields.get("max").and_then(ceiling),
                reset_in_sec: fields.get("resetInSec").and_then(|v| v.as_u64()),
            }),
            _ => None,
        }
    }
}

/// Negative or missing ceilings are how the backend spells "unlimited".
fn ceiling(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
}

/// Usage meters keyed by name (`requests`, `tools`, `tokens`).
///
/// Accepts both the live-usage shape (`{"requests": {"used", "max"}}`) and
/// the tier-template shape (`{"requests_per_min": 12}`); template keys are
/// normalized to their meter name. Entries that are neither are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct Limits(BTreeMap<String, Meter>);

impl Limits {
    pub fn get(&self, meter: &str) -> Option<&Meter> {
        self.0.get(meter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Meter)> {
        self.0.iter().map(|(name, meter)| (name.as_str(), meter))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of meters that have hit their ceiling.
    pub fn exhausted(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, meter)| meter.is_exhausted())
            .map(|(name, _)| name)
            .collect()
    }
}

impl FromIterator<(String, Meter)> for Limits {
    fn from_iter<I: IntoIterator<Item = (String, Meter)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Limits {
    fn from(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(fields) = value else {
            return Limits::default();
        };
        fields
            .iter()
            .filter_map(|(key, value)| Some((meter_name(key), Meter::from_value(value)?)))
            .collect()
    }
}

fn meter_name(key: &str) -> String {
    ["_per_min", "_per_hour", "_per_day"]
        .iter()
        .find_map(|suffix| key.strip_suffix(suffix))
        .unwrap_or(key)
        .to_string()
}

/// Response of `session.start` and `session.upgrade`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub session_id: SessionId,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub limits: Option<Limits>,
}

/// Response of `session.limits`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsReport {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub ok: bool,
}
