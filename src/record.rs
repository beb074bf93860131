//! Normalized statistics records and the persisted roster documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::FetchError;
use crate::platform::Platform;

/// Why a metric has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// The source responded but the metric was not found in it.
    NotOnPage,
    /// The fetch failed transiently and ran out of retries.
    FetchExhausted,
    /// The fetch failed permanently (e.g. profile does not exist).
    FetchTerminal,
}

/// One metric value: a count, a short categorical string (e.g. "Div 2"),
/// or an unavailable sentinel.
///
/// JSON form matches the roster file the UI reads: counts as numbers, text
/// as strings, not-on-page as `"N/A"` and both fetch-failure kinds as
/// `"Error"` (the distinction is in-memory only).
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Count(u64),
    Text(String),
    Unavailable(Unavailable),
}

impl StatValue {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StatValue::Unavailable(_))
    }

    /// Coerce a JSON scalar into a value. Non-negative integers become
    /// counts, anything else stringly-typed becomes text. Null, objects and
    /// arrays yield `None`.
    pub fn from_json_scalar(value: &serde_json::Value) -> Option<StatValue> {
        match value {
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(u) => Some(StatValue::Count(u)),
                None => Some(StatValue::Text(n.to_string())),
            },
            serde_json::Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else if let Ok(u) = s.parse::<u64>() {
                    Some(StatValue::Count(u))
                } else {
                    Some(StatValue::Text(s.to_string()))
                }
            }
            serde_json::Value::Bool(b) => Some(StatValue::Text(b.to_string())),
            _ => None,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Count(n) => serializer.serialize_u64(*n),
            StatValue::Text(t) => serializer.serialize_str(t),
            StatValue::Unavailable(Unavailable::NotOnPage) => serializer.serialize_str("N/A"),
            StatValue::Unavailable(_) => serializer.serialize_str("Error"),
        }
    }
}

impl<'de> Deserialize<'de> for StatValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => StatValue::Count(n),
            Raw::Str(s) => match s.as_str() {
                "N/A" | "--" => StatValue::Unavailable(Unavailable::NotOnPage),
                "Error" => StatValue::Unavailable(Unavailable::FetchExhausted),
                _ => StatValue::Text(s),
            },
        })
    }
}

/// Per-user, per-platform statistics snapshot. Built once per fetch and
/// never mutated afterwards; a later fetch supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub username: String,
    pub metrics: BTreeMap<String, StatValue>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
}

impl StatRecord {
    /// Fresh record with every metric defaulting to not-on-page; the
    /// extractor fills in what it finds.
    pub fn new(username: &str, metric_keys: &[&str]) -> Self {
        Self {
            username: username.to_string(),
            metrics: metric_keys
                .iter()
                .map(|k| (k.to_string(), StatValue::Unavailable(Unavailable::NotOnPage)))
                .collect(),
            failed: false,
            error_code: None,
        }
    }

    /// Record for a fetch that never produced usable data. Terminal failures
    /// (not found, unparsable) and exhausted-retry failures are marked with
    /// different unavailable kinds.
    pub fn failed(username: &str, metric_keys: &[&str], error: &FetchError) -> Self {
        let kind = if error.is_terminal() {
            Unavailable::FetchTerminal
        } else {
            Unavailable::FetchExhausted
        };
        Self {
            username: username.to_string(),
            metrics: metric_keys
                .iter()
                .map(|k| (k.to_string(), StatValue::Unavailable(kind)))
                .collect(),
            failed: true,
            error_code: error.status_code(),
        }
    }

    pub fn set(&mut self, key: &str, value: StatValue) {
        self.metrics.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.metrics.get(key)
    }

    pub fn is_unavailable(&self, key: &str) -> bool {
        self.metrics.get(key).map_or(true, |v| v.is_unavailable())
    }
}

/// One student's tracked profile on one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub reg_number: String,
    #[serde(default)]
    pub dept: String,
    pub profile_link: String,
    pub username: String,
    pub data: StatRecord,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        name: &str,
        reg_number: &str,
        dept: &str,
        profile_link: &str,
        username: &str,
        data: StatRecord,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            reg_number: reg_number.to_string(),
            dept: dept.to_string(),
            profile_link: profile_link.to_string(),
            username: username.to_string(),
            data,
            created_at: now,
            last_updated: now,
        }
    }
}

/// The whole persisted roster, keyed by platform. Saved and replaced as one
/// document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub leetcode: Vec<Profile>,
    #[serde(default)]
    pub codechef: Vec<Profile>,
    #[serde(default)]
    pub geeksforgeeks: Vec<Profile>,
}

impl Roster {
    pub fn platform(&self, platform: Platform) -> &Vec<Profile> {
        match platform {
            Platform::Leetcode => &self.leetcode,
            Platform::Codechef => &self.codechef,
            Platform::Geeksforgeeks => &self.geeksforgeeks,
        }
    }

    pub fn platform_mut(&mut self, platform: Platform) -> &mut Vec<Profile> {
        match platform {
            Platform::Leetcode => &mut self.leetcode,
            Platform::Codechef => &mut self.codechef,
            Platform::Geeksforgeeks => &mut self.geeksforgeeks,
        }
    }

    pub fn total(&self) -> usize {
        self.leetcode.len() + self.codechef.len() + self.geeksforgeeks.len()
    }
}
