use crate::error::{BoardlogError, Result};
use crate::logs::line::{LogLevel, LogLine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default number of lines per page
pub const DEFAULT_LOGS_PER_PAGE: usize = 200;

/// Filter and pagination options for reading the log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Only lines with this level
    pub level: Option<LogLevel>,
    /// Only lines carrying this trace id
    pub trace_id: Option<String>,
    /// One-based page number
    pub page: usize,
    /// Page size
    pub logs_per_page: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            level: None,
            trace_id: None,
            page: 1,
            logs_per_page: DEFAULT_LOGS_PER_PAGE,
        }
    }
}

impl LogQuery {
    /// Build a query from loosely-typed parameters. Empty strings mean "no filter".
    pub fn new(level: &str, trace_id: &str, page: usize, logs_per_page: usize) -> Result<Self> {
        let level = match level.trim() {
            "" => None,
            name => Some(name.parse::<LogLevel>()?),
        };
        let trace_id = match trace_id.trim() {
            "" => None,
            id => Some(id.to_string()),
        };

        let query = Self {
            level,
            trace_id,
            page,
            logs_per_page,
        };
        query.validate()?;
        Ok(query)
    }

    /// Check the page invariants
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(BoardlogError::InvalidQuery(
                "page must be at least 1".to_string(),
            ));
        }
        if self.logs_per_page == 0 {
            return Err(BoardlogError::InvalidQuery(
                "logs_per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a parsed line passes the level and trace id filters
    pub fn matches(&self, line: &LogLine) -> bool {
        if let Some(level) = self.level {
            if line.level != Some(level) {
                return false;
            }
        }
        if let Some(ref trace_id) = self.trace_id {
            if line.trace_id != *trace_id {
                return false;
            }
        }
        true
    }

    /// Index range of this page within the matched lines, clipped to `len`
    fn window(&self, len: usize) -> std::ops::Range<usize> {
        let start = (self.page - 1).saturating_mul(self.logs_per_page).min(len);
        let end = self.page.saturating_mul(self.logs_per_page).min(len);
        start..end
    }
}

/// How the total page count is derived from the number of matched lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalPagesRule {
    /// `ceil(matched / per_page)`, at least 1
    #[default]
    Exact,
    /// `matched / per_page + 1`; reports a trailing empty page at exact multiples
    Legacy,
}

impl TotalPagesRule {
    pub fn total_pages(&self, matched: usize, logs_per_page: usize) -> usize {
        let per_page = logs_per_page.max(1);
        match self {
            TotalPagesRule::Exact => matched.div_ceil(per_page).max(1),
            TotalPagesRule::Legacy => matched / per_page + 1,
        }
    }
}

/// One page of matching log lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPage {
    /// Matching raw lines, oldest first
    pub logs: Vec<String>,
    /// The requested page number
    pub page: usize,
    /// Number of pages for the filtered result
    pub total_pages: usize,
}

impl LogPage {
    /// A page with no lines
    pub fn empty(page: usize) -> Self {
        Self {
            logs: Vec::new(),
            page,
            total_pages: 1,
        }
    }
}

/// Read one page of matching lines from a log file
///
/// The whole file is scanned on every call and pagination is applied to the
/// complete filtered result. A missing or unreadable file yields an empty page.
///
/// # Arguments
/// * `file_path` - Path to the current log file
/// * `query` - Filters and page selection
/// * `rule` - How `total_pages` is computed
pub async fn read_log_page(
    file_path: &Path,
    query: &LogQuery,
    rule: TotalPagesRule,
) -> Result<LogPage> {
    query.validate()?;

    let matched = match collect_lines(file_path, |line| query.matches(line)).await {
        Ok(lines) => lines,
        Err(BoardlogError::FileUnavailable(reason)) => {
            tracing::warn!(path = %file_path.display(), %reason, "log file unavailable, returning empty page");
            return Ok(LogPage::empty(query.page));
        }
        Err(e) => return Err(e),
    };

    let total_pages = rule.total_pages(matched.len(), query.logs_per_page);
    let logs = matched[query.window(matched.len())].to_vec();

    tracing::debug!(
        path = %file_path.display(),
        matched = matched.len(),
        returned = logs.len(),
        page = query.page,
        total_pages,
        "read log page"
    );

    Ok(LogPage {
        logs,
        page: query.page,
        total_pages,
    })
}

/// Per-level line counts for a log file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSummary {
    /// Lines per level
    pub counts: BTreeMap<LogLevel, usize>,
    /// Lines that name no level
    pub unleveled: usize,
    /// Distinct trace ids seen (excluding the empty one)
    pub traces: usize,
}

impl LevelSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum::<usize>() + self.unleveled
    }
}

/// Count the lines of a log file by level
pub async fn scan_levels(file_path: &Path) -> Result<LevelSummary> {
    let mut summary = LevelSummary::default();
    let mut traces = std::collections::HashSet::new();

    let lines = match collect_lines(file_path, |_| true).await {
        Ok(lines) => lines,
        Err(BoardlogError::FileUnavailable(_)) => return Ok(summary),
        Err(e) => return Err(e),
    };

    for raw in &lines {
        let line = LogLine::parse(raw);
        match line.level {
            Some(level) => *summary.counts.entry(level).or_insert(0) += 1,
            None => summary.unleveled += 1,
        }
        if !line.trace_id.is_empty() {
            traces.insert(line.trace_id);
        }
    }
    summary.traces = traces.len();

    Ok(summary)
}

/// Read every line of the file and keep the raw text of those accepted by `keep`
///
/// Missing and unreadable files are reported as `FileUnavailable`.
async fn collect_lines<F>(file_path: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&LogLine) -> bool,
{
    let file = match File::open(file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(BoardlogError::FileUnavailable(format!(
                "{} does not exist",
                file_path.display()
            )));
        }
        Err(e) => {
            return Err(BoardlogError::FileUnavailable(format!(
                "failed to open {}: {}",
                file_path.display(),
                e
            )));
        }
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut kept = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await.map_err(|e| {
            BoardlogError::FileUnavailable(format!("failed to read log line: {}", e))
        })?;
        if n == 0 {
            break;
        }

        // Strip the line terminator
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        let raw = String::from_utf8_lossy(&buf);
        let line = LogLine::parse(&raw);
        if keep(&line) {
            kept.push(line.raw);
        }
    }

    Ok(kept)
}
