// src/error.rs

//! Unified error handling for the feed scraper.

use std::fmt;

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Feed could not be retrieved (transport error or non-2xx status)
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Feed payload is malformed or misses a required field
    #[error("Parse error: {0}")]
    Parse(String),

    /// Snapshot file could not be written
    #[error("Write failed for {path}: {message}")]
    Write { path: String, message: String },

    /// Entity is not part of the current snapshot
    #[error("No {kind} with id '{id}' in the current snapshot")]
    NotFound { kind: String, id: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a fetch failure for the given endpoint.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse failure.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a write failure for a snapshot path.
    pub fn write(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error for an entity lookup.
    pub fn not_found(kind: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error means the feed was unreachable.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Whether this error means the feed payload was rejected.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
