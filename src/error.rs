use thiserror::Error;

/// Main error type for the collision monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Inbound report errors
    #[error("Malformed state report: {0}")]
    MalformedReport(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Queue closed: {0}")]
    QueueClosed(String),

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;
