// src/model.rs
//! Wire types shared by the client, the dashboard store and the scan monitor.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Cloud vendor an item concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Azure, Provider::Gcp];

    /// Name as the backend spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Gcp => "GCP",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Ordinal severity attached to a news item (1..=3 on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ImpactLevel {
    Minor = 1,
    Major = 2,
    Critical = 3,
}

impl ImpactLevel {
    pub const ALL: [ImpactLevel; 3] = [ImpactLevel::Minor, ImpactLevel::Major, ImpactLevel::Critical];

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Badge text shown by the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            ImpactLevel::Minor => "Mineur",
            ImpactLevel::Major => "Majeur",
            ImpactLevel::Critical => "Critique",
        }
    }
}

impl TryFrom<i64> for ImpactLevel {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ImpactLevel::Minor),
            2 => Ok(ImpactLevel::Major),
            3 => Ok(ImpactLevel::Critical),
            other => Err(format!("impact level out of range: {other}")),
        }
    }
}

impl From<ImpactLevel> for i64 {
    fn from(level: ImpactLevel) -> Self {
        level as i64
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("impact level must be numeric: {s}"))?;
        ImpactLevel::try_from(n)
    }
}

/// Stable identifier of a news row. The backend sends either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NewsId(String);

impl NewsId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NewsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NewsId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for NewsId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for NewsId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NewsId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Num(i64),
            Text(String),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Num(n) => NewsId(n.to_string()),
            RawId::Text(s) => NewsId(s),
        })
    }
}

/// One analysed article as returned by `GET /news`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: NewsId,
    pub title: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub summary: String,
    pub provider: Provider,
    /// Empty when the backend has none (`null` or missing).
    #[serde(default, deserialize_with = "de_null_default")]
    pub category: String,
    pub impact_level: ImpactLevel,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub is_saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Aggregates from `GET /stats`. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub providers_stats: BTreeMap<String, u64>,
    #[serde(default)]
    pub categories_stats: BTreeMap<String, u64>,
    /// Keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub timeline_stats: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_news: u64,
    #[serde(default)]
    pub critical_news: u64,
    #[serde(default)]
    pub active_provider: Option<String>,
}

impl StatsSnapshot {
    pub fn provider_count(&self, provider: Provider) -> u64 {
        self.providers_stats
            .get(provider.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Timeline points in ascending date order (chart input).
    pub fn timeline_series(&self) -> Vec<(String, u64)> {
        self.timeline_stats
            .iter()
            .map(|(d, n)| (d.clone(), *n))
            .collect()
    }
}

/// Backend-reported state of the ingestion job (`GET /scan-status`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    pub is_scanning: bool,
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: u8,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub new_added: u32,
    #[serde(default)]
    pub total_found: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Answer of `POST /trigger-scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TriggerReply {
    Started {
        #[serde(default)]
        message: Option<String>,
    },
    Busy {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Answer of `POST /news/{id}/toggle-save`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleAck {
    #[serde(default)]
    pub status: String,
    /// Value stored by the backend after the toggle, when it reports one.
    #[serde(default)]
    pub is_saved: Option<bool>,
}

/// Answer of `POST /chat`; `response` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

// --- serde helpers ---

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Offset-less timestamps are stored in UTC by the backend.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Like `#[serde(default)]`, but an explicit `null` also maps to the default.
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}
