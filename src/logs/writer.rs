use crate::error::{BoardlogError, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default number of rotated files to keep (30 days of daily rotation)
pub const DEFAULT_BACKUP_COUNT: usize = 30;

/// Date suffix appended to rotated files: `debug.log.2024-01-31`
const ROTATION_SUFFIX_FORMAT: &str = "%Y-%m-%d";

/// Append-only log file that rotates at midnight (local time)
///
/// On rotation the current file is renamed with the date it covers, a fresh
/// file is opened at the same path and backups beyond `backup_count` are
/// removed, oldest first.
pub struct RotatingFile {
    /// Path of the current log file
    path: PathBuf,
    /// Open handle in append mode
    file: File,
    /// Local date the current file covers
    opened_on: NaiveDate,
    /// Number of rotated files to keep
    backup_count: usize,
    /// Current size of the file in bytes
    size: u64,
}

impl RotatingFile {
    /// Open (or create) the log file at `path`
    ///
    /// # Arguments
    /// * `path` - Path of the current log file
    /// * `backup_count` - Number of rotated files to retain
    pub fn open(path: &Path, backup_count: usize) -> Result<Self> {
        Self::open_at(path, backup_count, Local::now())
    }

    /// Open the log file as if the current time were `now`
    pub fn open_at(path: &Path, backup_count: usize, now: DateTime<Local>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BoardlogError::LogError(format!("Failed to create log directory: {}", e))
            })?;
        }

        let file = open_append(path)?;
        let metadata = file
            .metadata()
            .map_err(|e| BoardlogError::LogFileError(format!("Failed to stat log file: {}", e)))?;

        // An existing non-empty file covers the day it was last written
        let opened_on = if metadata.len() > 0 {
            metadata
                .modified()
                .map(|t| DateTime::<Local>::from(t).date_naive())
                .unwrap_or_else(|_| now.date_naive())
        } else {
            now.date_naive()
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            opened_on,
            backup_count,
            size: metadata.len(),
        })
    }

    /// Append one line written at `now`, rotating first if the day has changed
    pub fn write_line_at(&mut self, line: &str, now: DateTime<Local>) -> Result<()> {
        if now.date_naive() != self.opened_on {
            self.rotate(now)?;
        }

        let mut entry = Vec::with_capacity(line.len() + 1);
        entry.extend_from_slice(line.as_bytes());
        if !line.ends_with('\n') {
            entry.push(b'\n');
        }

        self.file
            .write_all(&entry)
            .map_err(|e| BoardlogError::LogError(format!("Failed to write to log: {}", e)))?;
        self.file
            .flush()
            .map_err(|e| BoardlogError::LogError(format!("Failed to flush log: {}", e)))?;

        self.size += entry.len() as u64;
        Ok(())
    }

    /// Close the current file under its dated name and start a new one
    fn rotate(&mut self, now: DateTime<Local>) -> Result<()> {
        let rotated_path = self.backup_path(self.opened_on)?;

        if self.size > 0 {
            if rotated_path.exists() {
                std::fs::remove_file(&rotated_path).map_err(|e| {
                    BoardlogError::LogRotationError(format!("Failed to replace backup: {}", e))
                })?;
            }
            std::fs::rename(&self.path, &rotated_path).map_err(|e| {
                BoardlogError::LogRotationError(format!("Failed to rotate log: {}", e))
            })?;
            self.file = open_append(&self.path)?;
            self.size = 0;
        }

        self.opened_on = now.date_naive();
        self.prune_backups()
    }

    fn backup_path(&self, date: NaiveDate) -> Result<PathBuf> {
        let file_name = self.file_name()?;
        Ok(self.path.with_file_name(format!(
            "{}.{}",
            file_name,
            date.format(ROTATION_SUFFIX_FORMAT)
        )))
    }

    fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| BoardlogError::LogRotationError("Invalid log file name".to_string()))
    }

    /// Rotated files next to the current one, oldest first
    pub fn backups(&self) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}.", self.file_name()?);
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };

        let mut dated: Vec<(NaiveDate, PathBuf)> = std::fs::read_dir(&dir)
            .map_err(|e| BoardlogError::LogRotationError(format!("Failed to list backups: {}", e)))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let suffix = name.strip_prefix(&prefix)?;
                let date = NaiveDate::parse_from_str(suffix, ROTATION_SUFFIX_FORMAT).ok()?;
                Some((date, entry.path()))
            })
            .collect();

        dated.sort_by_key(|(date, _)| *date);
        Ok(dated.into_iter().map(|(_, path)| path).collect())
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.backups()?;
        if backups.len() <= self.backup_count {
            return Ok(());
        }

        let excess = backups.len() - self.backup_count;
        for path in &backups[..excess] {
            std::fs::remove_file(path).map_err(|e| {
                BoardlogError::LogRotationError(format!(
                    "Failed to remove old log {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Path to the current log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log file
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Local date the current file covers
    pub fn opened_on(&self) -> NaiveDate {
        self.opened_on
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| BoardlogError::LogError(format!("Failed to flush log: {}", e)))
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BoardlogError::LogFileError(format!("{}: {}", path.display(), e)))
}
