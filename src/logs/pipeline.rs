use crate::error::{BoardlogError, Result};
use crate::logs::filters::FilterChain;
use crate::logs::line::{LogLevel, TIMESTAMP_FORMAT};
use crate::logs::writer::{RotatingFile, DEFAULT_BACKUP_COUNT};
use crate::trace::TraceId;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A record on its way to the log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub module: String,
    pub message: String,
    pub trace_id: Option<TraceId>,
}

impl LogRecord {
    pub fn new(level: LogLevel, module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            module: module.into(),
            message: message.into(),
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// Settings for the file pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Current log file
    pub path: PathBuf,
    /// Rotated files to keep
    pub backup_count: usize,
    /// Records below this level are not written
    pub min_level: LogLevel,
    /// Admission filters, in order
    pub filters: FilterChain,
}

impl PipelineSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_count: DEFAULT_BACKUP_COUNT,
            min_level: LogLevel::Debug,
            filters: FilterChain::default(),
        }
    }
}

/// Writes formatted records to the rotating log file
///
/// Constructed once at startup and shared for the lifetime of the process.
/// Writes are synchronous: `tracing` calls the layer from whatever thread emits
/// the event, including tokio workers, so each record is written and flushed
/// under a `std::sync::Mutex` that is never held across an `.await`. Lines are
/// short and the file is local, so a worker blocks only for one small append.
pub struct LogPipeline {
    min_level: LogLevel,
    filters: FilterChain,
    file: Mutex<RotatingFile>,
}

impl LogPipeline {
    pub fn new(settings: PipelineSettings) -> Result<Self> {
        let file = RotatingFile::open(&settings.path, settings.backup_count)?;
        tracing::debug!(
            path = %file.path().display(),
            size = file.size(),
            opened_on = %file.opened_on(),
            "log file opened"
        );
        Ok(Self {
            min_level: settings.min_level,
            filters: settings.filters,
            file: Mutex::new(file),
        })
    }

    /// Filter, format and append a record
    ///
    /// # Returns
    /// * `Ok(true)` - The record was written
    /// * `Ok(false)` - The record was dropped by the level or a filter
    pub fn write(&self, record: LogRecord) -> Result<bool> {
        self.write_at(record, Local::now())
    }

    pub fn write_at(&self, mut record: LogRecord, now: DateTime<Local>) -> Result<bool> {
        if record.level < self.min_level || !self.filters.admit(&mut record) {
            return Ok(false);
        }

        let line = format_record(&record, now, std::process::id(), thread_number());
        let mut file = self
            .file
            .lock()
            .map_err(|_| BoardlogError::Internal("log file lock poisoned".to_string()))?;
        file.write_line_at(&line, now)?;
        Ok(true)
    }

    pub fn flush(&self) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| BoardlogError::Internal("log file lock poisoned".to_string()))?;
        file.flush()
    }
}

/// Format a record as one verbose log line:
/// `{LEVEL} {timestamp} {trace_id} {module} {pid} {thread} {message}`
///
/// Newlines in the message are escaped so that one record is always one line.
/// A record that reaches the formatter without a trace id (the `trace_id` filter
/// is not configured) gets `-`, so the prefix keeps its shape.
pub fn format_record(record: &LogRecord, now: DateTime<Local>, pid: u32, thread: u64) -> String {
    // The trace id must stay a single token of the prefix
    let trace_id: String = record
        .trace_id
        .as_ref()
        .map(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or("-")
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let module = if record.module.is_empty() {
        "-"
    } else {
        record.module.as_str()
    };
    let message = record.message.replace('\r', "\\r").replace('\n', "\\n");

    format!(
        "{} {} {} {} {} {} {}",
        record.level,
        now.format(TIMESTAMP_FORMAT),
        trace_id,
        module,
        pid,
        thread,
        message
    )
}

/// Small stable number for the current thread
fn thread_number() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static NUMBER: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    NUMBER.with(|n| *n)
}

/// Forwards `tracing` events to a [`LogPipeline`]
///
/// The trace id is read from the event's own `trace_id` field, so callers pass it
/// explicitly: `info!(trace_id = %ctx.trace_id, "resume updated")`.
pub struct PipelineLayer {
    pipeline: Arc<LogPipeline>,
}

impl PipelineLayer {
    pub fn new(pipeline: Arc<LogPipeline>) -> Self {
        Self { pipeline }
    }
}

impl<S: Subscriber> Layer<S> for PipelineLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let module = metadata
            .module_path()
            .unwrap_or_else(|| metadata.target())
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_string();

        let trace_id = visitor.trace_id.take().map(TraceId::new);
        let mut record = LogRecord::new((*metadata.level()).into(), module, visitor.message());
        record.trace_id = trace_id;

        // Never log from here: this layer receives every event
        if let Err(e) = self.pipeline.write(record) {
            eprintln!("boardlog: failed to write log record: {}", e);
        }
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: String,
    trace_id: Option<String>,
}

impl RecordVisitor {
    fn message(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: &dyn std::fmt::Display) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "trace_id" => self.trace_id = Some(value.to_string()),
            name => self.push_field(name, &value),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{:?}", value);
        match field.name() {
            "message" => self.message = text,
            "trace_id" => self.trace_id = Some(text),
            name => self.push_field(name, &text),
        }
    }
}

/// Open a pipeline with default settings at `path`
pub fn open_pipeline(path: &Path) -> Result<Arc<LogPipeline>> {
    Ok(Arc::new(LogPipeline::new(PipelineSettings::new(path))?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{LogLine, RecordFilter};
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_record_round_trips_through_parser() {
        let record = LogRecord::new(LogLevel::Warning, "views", "slow query\ntook 3s")
            .with_trace_id(TraceId::new("abc123"));
        let line = format_record(&record, noon(), 4242, 7);

        assert_eq!(
            line,
            "WARNING 2024-03-05 12:00:00,000 abc123 views 4242 7 slow query\\ntook 3s"
        );
        let parsed = LogLine::parse(&line);
        assert_eq!(parsed.level, Some(LogLevel::Warning));
        assert_eq!(parsed.trace_id, "abc123");
        assert_eq!(parsed.message, "slow query\\ntook 3s");
    }

    #[test]
    fn test_pipeline_applies_filters() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("debug.log");
        let pipeline = LogPipeline::new(PipelineSettings::new(&path)).unwrap();

        assert!(pipeline
            .write_at(LogRecord::new(LogLevel::Info, "views", "hello"), noon())
            .unwrap());
        assert!(!pipeline
            .write_at(
                LogRecord::new(LogLevel::Info, "autoreload", "Watching for file changes with StatReloader"),
                noon()
            )
            .unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(LogLine::parse(lines[0]).trace_id, "no-trace-id");
    }

    #[test]
    fn test_trace_id_filter_stamps_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let with_filter = temp_dir.path().join("with.log");
        let without_filter = temp_dir.path().join("without.log");

        let pipeline = LogPipeline::new(PipelineSettings::new(&with_filter)).unwrap();
        pipeline
            .write_at(LogRecord::new(LogLevel::Info, "views", "hello"), noon())
            .unwrap();

        let mut settings = PipelineSettings::new(&without_filter);
        settings.filters = FilterChain::new(vec![RecordFilter::ExcludeReloader]);
        let pipeline = LogPipeline::new(settings).unwrap();
        pipeline
            .write_at(LogRecord::new(LogLevel::Info, "views", "hello"), noon())
            .unwrap();

        let with = std::fs::read_to_string(&with_filter).unwrap();
        let without = std::fs::read_to_string(&without_filter).unwrap();
        assert_eq!(LogLine::parse(with.trim_end()).trace_id, "no-trace-id");
        assert_eq!(LogLine::parse(without.trim_end()).trace_id, "-");
    }

    #[test]
    fn test_pipeline_min_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = PipelineSettings::new(temp_dir.path().join("debug.log"));
        settings.min_level = LogLevel::Warning;
        settings.filters = FilterChain::new(vec![RecordFilter::TraceId]);
        let pipeline = LogPipeline::new(settings).unwrap();

        assert!(!pipeline
            .write_at(LogRecord::new(LogLevel::Info, "views", "quiet"), noon())
            .unwrap());
        assert!(pipeline
            .write_at(LogRecord::new(LogLevel::Error, "views", "loud"), noon())
            .unwrap());
    }

    #[test]
    fn test_layer_forwards_events_with_explicit_trace_id() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("debug.log");
        let pipeline = open_pipeline(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(PipelineLayer::new(pipeline.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let trace_id = TraceId::new("req77");
            tracing::info!(trace_id = %trace_id, resume = 12, "resume updated");
            tracing::error!("no request here");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<LogLine> = content.lines().map(LogLine::parse).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].level, Some(LogLevel::Info));
        assert_eq!(lines[0].trace_id, "req77");
        assert_eq!(lines[0].message, "resume updated resume=12");
        assert_eq!(lines[0].module.as_deref(), Some("tests"));
        assert_eq!(lines[1].level, Some(LogLevel::Error));
        assert_eq!(lines[1].trace_id, "no-trace-id");
    }
}
