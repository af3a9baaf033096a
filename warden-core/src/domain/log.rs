//! Log domain types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A log line delivered over the live log stream
///
/// Timestamps are informational; arrival order is the only ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLogEntry")]
pub struct LogEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

/// Frame shape as sent by the control plane
///
/// Some servers put the level in `type`, others send `"type": "log"` with a
/// separate `level` field.
#[derive(Deserialize)]
struct RawLogEntry {
    message: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: Option<String>,
    level: Option<String>,
}

impl TryFrom<RawLogEntry> for LogEntry {
    type Error = String;

    fn try_from(raw: RawLogEntry) -> Result<Self, Self::Error> {
        let level = match (raw.level.as_deref(), raw.kind.as_deref()) {
            (Some(level), _) => level.parse()?,
            (None, Some("log")) => LogLevel::Info,
            (None, Some(kind)) => kind.parse()?,
            (None, None) => return Err("missing field `type`".to_string()),
        };

        Ok(Self {
            message: raw.message,
            timestamp: raw.timestamp,
            level,
        })
    }
}

impl LogEntry {
    /// Decodes one stream frame
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// RFC 3339 timestamps, or naive ISO 8601 timestamps taken as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
