//! Error types for the world boss watcher

/// Errors that can occur in the world boss watcher
#[derive(Debug, thiserror::Error)]
pub enum WorldbossError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

/// Result type alias for world boss watcher operations
pub type Result<T> = std::result::Result<T, WorldbossError>;
