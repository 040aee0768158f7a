// Record admission filters applied before a record reaches the log file

use crate::error::{BoardlogError, Result};
use crate::logs::pipeline::LogRecord;
use crate::trace::TraceId;

/// Trace id written for records produced outside of any request
pub const NO_TRACE_ID: &str = "no-trace-id";

/// Message fragments emitted by the development auto-reloader
const RELOADER_MARKERS: [&str; 2] = ["StatReloader", "Watching for file changes"];

/// A stateless predicate over a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Drop file-watcher housekeeping records
    ExcludeReloader,
    /// Stamp the sentinel on records that carry no trace id. Without this
    /// filter such records are written with `-` in the trace id column.
    TraceId,
}

impl RecordFilter {
    /// Look up a filter by its configuration name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "exclude_reloader" => Ok(RecordFilter::ExcludeReloader),
            "trace_id" => Ok(RecordFilter::TraceId),
            other => Err(BoardlogError::ConfigValidationError(format!(
                "Unknown log filter: {}. Must be one of: exclude_reloader, trace_id",
                other
            ))),
        }
    }

    /// Apply the filter. Returns `false` when the record must be dropped.
    pub fn apply(&self, record: &mut LogRecord) -> bool {
        match self {
            RecordFilter::ExcludeReloader => !is_reloader_record(record),
            RecordFilter::TraceId => {
                if record.trace_id.is_none() {
                    record.trace_id = Some(TraceId::sentinel());
                }
                true
            }
        }
    }
}

fn is_reloader_record(record: &LogRecord) -> bool {
    record.module.ends_with("autoreload")
        || RELOADER_MARKERS
            .iter()
            .any(|marker| record.message.contains(marker))
}

/// Ordered set of filters selected at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<RecordFilter>,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self {
            filters: vec![RecordFilter::ExcludeReloader, RecordFilter::TraceId],
        }
    }
}

impl FilterChain {
    pub fn new(filters: Vec<RecordFilter>) -> Self {
        Self { filters }
    }

    /// Build a chain from configuration names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let filters = names
            .iter()
            .map(|name| RecordFilter::from_name(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    /// Run every filter in order; stops at the first one that drops the record
    pub fn admit(&self, record: &mut LogRecord) -> bool {
        self.filters.iter().all(|filter| filter.apply(record))
    }

    pub fn filters(&self) -> &[RecordFilter] {
        &self.filters
    }
}
