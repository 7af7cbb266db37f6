//! Error types for the application

use thiserror::Error;

/// Result type alias using our BotError
pub type Result<T> = std::result::Result<T, BotError>;

/// Main error type for scraping, storage and delivery operations
#[derive(Error, Debug)]
pub enum BotError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// File system errors (chart artifacts, logo)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed scraped record
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Source returned a non-success status or an unusable body
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No trade condition (or stored event) for an invocation
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Chat send/delete/history failures
    #[error("Delivery failure: {0}")]
    Delivery(String),

    /// Chart rendering errors
    #[error("Chart error: {0}")]
    Chart(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<url::ParseError> for BotError {
    fn from(err: url::ParseError) -> Self {
        BotError::Configuration(format!("invalid URL: {}", err))
    }
}

impl From<image::ImageError> for BotError {
    fn from(err: image::ImageError) -> Self {
        BotError::Chart(err.to_string())
    }
}
