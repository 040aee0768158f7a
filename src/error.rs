use thiserror::Error;

/// Main error type for the boardlog log console
#[derive(Debug, Error)]
pub enum BoardlogError {
    // Query errors
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    // Access errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Log-related errors
    #[error("Log file unavailable: {0}")]
    FileUnavailable(String),

    #[error("Log error: {0}")]
    LogError(String),

    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoardlogError {
    /// Whether the error was caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BoardlogError::InvalidQuery(_)
                | BoardlogError::UnknownLevel(_)
                | BoardlogError::Unauthorized(_)
        )
    }
}

/// Result type alias for boardlog operations
pub type Result<T> = std::result::Result<T, BoardlogError>;
