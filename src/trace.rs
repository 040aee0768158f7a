// Request trace ids
//
// A trace id is created (or accepted from the caller) once per inbound request
// and then passed explicitly to every log call made while serving it.

use crate::logs::NO_TRACE_ID;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the trace id on requests and responses
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Longest caller-supplied trace id that is accepted
const MAX_TRACE_ID_LEN: usize = 64;

/// Opaque per-request correlation token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id (32 lowercase hex characters)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The placeholder used for records outside any request
    pub fn sentinel() -> Self {
        Self(NO_TRACE_ID.to_string())
    }

    /// Accept a caller-supplied id if it is safe to embed in a log line
    ///
    /// The id becomes a single whitespace-free token of the line prefix, so only
    /// ASCII alphanumerics, `-` and `_` are allowed.
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= MAX_TRACE_ID_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request context handed to request handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: TraceId,
}

impl TraceContext {
    /// Use the caller's id when it is valid, otherwise generate one
    pub fn from_header(value: Option<&str>) -> Self {
        let trace_id = value
            .and_then(TraceId::from_header)
            .unwrap_or_else(TraceId::generate);
        Self { trace_id }
    }
}
