use crate::error::{BoardlogError, Result};
use crate::logs::{
    FilterChain, LogLevel, PipelineSettings, TotalPagesRule, DEFAULT_BACKUP_COUNT,
    DEFAULT_LOGS_PER_PAGE,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding an admin token when no config file is given
pub const ADMIN_TOKEN_ENV: &str = "BOARDLOG_ADMIN_TOKEN";

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardlogConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub console: ConsoleConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:8000`
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Log file, pipeline and query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Current log file
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Page size when the caller gives none
    #[serde(default = "default_logs_per_page")]
    pub default_logs_per_page: usize,

    /// Largest page size a caller may ask for
    #[serde(default = "default_max_logs_per_page")]
    pub max_logs_per_page: usize,

    /// How total_pages is computed
    #[serde(default)]
    pub total_pages_rule: TotalPagesRule,

    /// Rotated files to keep
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,

    /// Record filters, by name, applied in order
    #[serde(default = "default_filters")]
    pub filters: Vec<String>,

    /// Minimum level written to the file
    #[serde(default = "default_file_level")]
    pub level: String,
}

/// Administrative access
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer tokens that grant access to the log endpoint
    #[serde(default)]
    pub admin_tokens: Vec<String>,
}

/// Console output of the server process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Env-filter directive, e.g. `info` or `boardlog=debug,tower_http=info`
    #[serde(default = "default_console_level")]
    pub level: String,

    #[serde(default)]
    pub format: ConsoleFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Pretty,
    Json,
}

// Default value functions for serde
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/debug.log")
}

fn default_logs_per_page() -> usize {
    DEFAULT_LOGS_PER_PAGE
}

fn default_max_logs_per_page() -> usize {
    1000
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

fn default_filters() -> Vec<String> {
    vec!["exclude_reloader".to_string(), "trace_id".to_string()]
}

fn default_file_level() -> String {
    "DEBUG".to_string()
}

fn default_console_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            default_logs_per_page: default_logs_per_page(),
            max_logs_per_page: default_max_logs_per_page(),
            total_pages_rule: TotalPagesRule::default(),
            backup_count: default_backup_count(),
            filters: default_filters(),
            level: default_file_level(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            level: default_console_level(),
            format: ConsoleFormat::default(),
        }
    }
}

impl BoardlogConfig {
    /// Load the configuration from a file, or from defaults and the environment
    ///
    /// Without a file the admin token must come from `BOARDLOG_ADMIN_TOKEN`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::default();
                if let Ok(token) = std::env::var(ADMIN_TOKEN_ENV) {
                    config.auth.admin_tokens.push(token);
                }
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BoardlogError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        // Determine format based on file extension
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(BoardlogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML configuration
    pub fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| BoardlogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Parse JSON configuration
    pub fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| BoardlogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if self.server.request_timeout_secs == 0 {
            return Err(BoardlogError::ConfigValidationError(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.logs.file.as_os_str().is_empty() {
            return Err(BoardlogError::MissingConfigField("logs.file".to_string()));
        }

        if self.logs.default_logs_per_page == 0 {
            return Err(BoardlogError::ConfigValidationError(
                "default_logs_per_page must be at least 1".to_string(),
            ));
        }

        if self.logs.max_logs_per_page < self.logs.default_logs_per_page {
            return Err(BoardlogError::ConfigValidationError(format!(
                "max_logs_per_page ({}) cannot be smaller than default_logs_per_page ({})",
                self.logs.max_logs_per_page, self.logs.default_logs_per_page
            )));
        }

        self.file_level()?;
        self.filter_chain()?;

        if self.auth.admin_tokens.iter().all(|t| t.trim().is_empty()) {
            return Err(BoardlogError::MissingConfigField(format!(
                "auth.admin_tokens (or set {})",
                ADMIN_TOKEN_ENV
            )));
        }

        Ok(())
    }

    /// Parsed bind address
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|e| {
            BoardlogError::ConfigValidationError(format!(
                "Invalid bind_address {}: {}",
                self.server.bind_address, e
            ))
        })
    }

    /// Minimum level written to the log file
    pub fn file_level(&self) -> Result<LogLevel> {
        self.logs.level.parse::<LogLevel>().map_err(|_| {
            BoardlogError::ConfigValidationError(format!(
                "Invalid logs.level: {}. Must be one of: DEBUG, INFO, WARNING, ERROR, CRITICAL",
                self.logs.level
            ))
        })
    }

    pub fn filter_chain(&self) -> Result<FilterChain> {
        FilterChain::from_names(&self.logs.filters)
    }

    /// Settings for the file pipeline
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        Ok(PipelineSettings {
            path: self.logs.file.clone(),
            backup_count: self.logs.backup_count,
            min_level: self.file_level()?,
            filters: self.filter_chain()?,
        })
    }

    /// Request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Expand environment variables in paths and tokens
    fn expand_env_vars(&mut self) {
        self.logs.file = PathBuf::from(expand_env_in_string(&self.logs.file.to_string_lossy()));
        self.auth.admin_tokens = self
            .auth
            .admin_tokens
            .iter()
            .map(|token| expand_env_in_string(token))
            .collect();
    }
}

/// Expand `$VAR` and `${VAR}` in a string
fn expand_env_in_string(s: &str) -> String {
    let mut result = s.to_string();

    // Longest names first so `$HOME_DIR` is not clobbered by `$HOME`
    let mut vars: Vec<(String, String)> = std::env::vars().collect();
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for (key, value) in vars {
        result = result.replace(&format!("${{{}}}", key), &value);
        result = result.replace(&format!("${}", key), &value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::RecordFilter;

    fn with_token() -> BoardlogConfig {
        let mut config = BoardlogConfig::default();
        config.auth.admin_tokens = vec!["secret".to_string()];
        config
    }

    #[test]
    fn test_defaults() {
        let config = BoardlogConfig::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:8000");
        assert_eq!(config.logs.file, PathBuf::from("logs/debug.log"));
        assert_eq!(config.logs.default_logs_per_page, 200);
        assert_eq!(config.logs.backup_count, 30);
        assert_eq!(config.logs.total_pages_rule, TotalPagesRule::Exact);
        assert_eq!(config.console.format, ConsoleFormat::Pretty);
    }

    #[test]
    fn test_validate_requires_admin_token() {
        let config = BoardlogConfig::default();
        assert!(matches!(
            config.validate(),
            Err(BoardlogError::MissingConfigField(_))
        ));
        assert!(with_token().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_bind_address() {
        let mut config = with_token();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_page_sizes() {
        let mut config = with_token();
        config.logs.default_logs_per_page = 0;
        assert!(config.validate().is_err());

        let mut config = with_token();
        config.logs.max_logs_per_page = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_level_and_filters() {
        let mut config = with_token();
        config.logs.level = "chatty".to_string();
        assert!(config.validate().is_err());

        let mut config = with_token();
        config.logs.filters = vec!["nope".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_settings() {
        let mut config = with_token();
        config.logs.level = "warning".to_string();
        config.logs.filters = vec!["trace_id".to_string()];

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.min_level, LogLevel::Warning);
        assert_eq!(settings.filters.filters(), &[RecordFilter::TraceId]);
        assert_eq!(settings.backup_count, 30);
    }

    #[test]
    fn test_expand_env_in_string() {
        std::env::set_var("BOARDLOG_TEST_DIR", "/var/log/board");
        assert_eq!(
            expand_env_in_string("${BOARDLOG_TEST_DIR}/debug.log"),
            "/var/log/board/debug.log"
        );
        assert_eq!(
            expand_env_in_string("$BOARDLOG_TEST_DIR/debug.log"),
            "/var/log/board/debug.log"
        );
    }
}
