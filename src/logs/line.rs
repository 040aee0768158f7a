use crate::error::BoardlogError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used in the verbose line prefix, e.g. `2024-01-01 10:00:00,123`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// All levels, least severe first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Canonical upper-case name as it appears in the log file
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Match a token from the log file against the canonical names only.
    /// User input goes through [`FromStr`], which is case-insensitive and knows aliases.
    pub fn from_canonical(token: &str) -> Option<LogLevel> {
        LogLevel::ALL.iter().copied().find(|l| token == l.as_str())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = BoardlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(BoardlogError::UnknownLevel(s.to_string())),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// A single line of the log file with the fields parsed from its prefix
///
/// Lines written by the pipeline look like:
/// `INFO 2024-01-01 10:00:00,123 4f0c9e... views 4242 139871 GET /api/logs/ 200 3ms`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// The line exactly as read (without the line terminator)
    pub raw: String,
    /// Severity, if the line names one
    pub level: Option<LogLevel>,
    /// Timestamp text from the prefix
    pub timestamp: Option<String>,
    /// Request trace id; empty when the prefix could not be parsed
    pub trace_id: String,
    /// Module that emitted the record
    pub module: Option<String>,
    /// Free-form message text
    pub message: String,
}

impl LogLine {
    /// Parse a raw log line. Never fails: unparseable lines keep their raw text
    /// as the message and carry an empty trace id.
    pub fn parse(raw: &str) -> Self {
        Self::parse_verbose(raw).unwrap_or_else(|| Self {
            raw: raw.to_string(),
            level: raw
                .split_whitespace()
                .find_map(LogLevel::from_canonical),
            timestamp: None,
            trace_id: String::new(),
            module: None,
            message: raw.to_string(),
        })
    }

    /// Parse the full `{LEVEL} {date} {time} {trace_id} {module} {pid} {thread} {message}` layout
    fn parse_verbose(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(8, ' ');
        let level = LogLevel::from_canonical(parts.next()?)?;
        let date = parts.next()?;
        let time = parts.next()?;
        let timestamp = format!("{} {}", date, time);
        NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT).ok()?;

        let trace_id = parts.next().filter(|t| !t.is_empty())?;
        let module = parts.next().filter(|m| !m.is_empty())?;
        parts.next()?.parse::<u32>().ok()?;
        parts.next()?.parse::<u64>().ok()?;
        let message = parts.next().unwrap_or("");

        Some(Self {
            raw: raw.to_string(),
            level: Some(level),
            timestamp: Some(timestamp),
            trace_id: trace_id.to_string(),
            module: Some(module.to_string()),
            message: message.to_string(),
        })
    }
}
