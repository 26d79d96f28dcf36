use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] hearth_core::Error),
    #[error(transparent)]
    Auth(#[from] hearth_core::auth::AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `hearth auth login` first.")]
    NotSignedIn,
    #[error("No task content provided")]
    EmptyContent,
    #[error("Invalid date {0:?}; expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Coordinates out of range: {lat}, {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error("{0}")]
    Notice(String),
}
