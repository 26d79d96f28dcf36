//! Error types for hearth-core

use thiserror::Error;

use crate::live_map::GeolocationError;

/// Result type alias using hearth-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hearth-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Backend rejected a read or write
    #[error("Backend error: {0}")]
    Backend(String),

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Media/object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Position lookup failed on the sharing device
    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this failure came from user input rather than the backend.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
