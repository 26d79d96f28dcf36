//! User-facing messages produced by feature areas.
//!
//! Failures are caught where they happen, logged, and turned into a
//! [`Notice`]; nothing propagates to a global handler.

use std::fmt;

use serde::Serialize;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Log a failed action and describe it for the user.
    ///
    /// Input errors are shown as-is; everything else is prefixed with the
    /// action that failed.
    pub fn from_error(action: &str, error: &Error) -> Self {
        match error {
            Error::InvalidInput(message) => {
                tracing::warn!("{action} rejected: {message}");
                Self::warning(message.clone())
            }
            Error::Geolocation(geolocation) => {
                tracing::warn!("{action} stopped: {geolocation}");
                Self::error(geolocation.guidance())
            }
            other => {
                tracing::error!("{action} failed: {other}");
                Self::error(format!("{action} failed. {other}"))
            }
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.level, NoticeLevel::Error)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
