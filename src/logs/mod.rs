// Logs module - Log pipeline, rotation and paged reading

mod filters;
mod line;
mod pipeline;
mod reader;
mod writer;

pub use filters::{FilterChain, RecordFilter, NO_TRACE_ID};
pub use line::{LogLevel, LogLine, TIMESTAMP_FORMAT};
pub use pipeline::{
    format_record, open_pipeline, LogPipeline, LogRecord, PipelineLayer, PipelineSettings,
};
pub use reader::{
    read_log_page, scan_levels, LevelSummary, LogPage, LogQuery, TotalPagesRule,
    DEFAULT_LOGS_PER_PAGE,
};
pub use writer::{RotatingFile, DEFAULT_BACKUP_COUNT};
