//! Client configuration.
//!
//! Values are public endpoints and keys needed to reach the hosted backend.
//! Secret credentials never live here.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_SUPABASE_URL: &str = "HEARTH_SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "HEARTH_SUPABASE_ANON_KEY";
const ENV_STORAGE_BUCKET: &str = "HEARTH_STORAGE_BUCKET";
const ENV_LOCATION_POLL_SECS: &str = "HEARTH_LOCATION_POLL_SECS";
const ENV_MARKER_STALE_SECS: &str = "HEARTH_MARKER_STALE_SECS";

const DEFAULT_STORAGE_BUCKET: &str = "media";
const DEFAULT_LOCATION_POLL_SECS: u64 = 5;
const DEFAULT_MARKER_STALE_SECS: u64 = 30 * 60;

/// Backend endpoints and client tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_location_poll_secs")]
    pub location_poll_interval_secs: u64,
    /// Markers whose location is older than this are swept; `0` disables.
    #[serde(default = "default_marker_stale_secs")]
    pub marker_stale_after_secs: u64,
}

impl ClientConfig {
    /// Config with default bucket and intervals.
    pub fn new(supabase_url: &str, supabase_anon_key: &str) -> Result<Self> {
        Self {
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: supabase_anon_key.to_string(),
            storage_bucket: default_storage_bucket(),
            location_poll_interval_secs: default_location_poll_secs(),
            marker_stale_after_secs: default_marker_stale_secs(),
        }
        .validated()
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when none of the variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Load configuration from a JSON file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.validated()
    }

    #[must_use]
    pub const fn location_poll_interval(&self) -> Duration {
        Duration::from_secs(self.location_poll_interval_secs)
    }

    #[must_use]
    pub const fn marker_stale_after(&self) -> Option<Duration> {
        if self.marker_stale_after_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.marker_stale_after_secs))
        }
    }

    fn validated(mut self) -> Result<Self> {
        let url = normalize_text_option(Some(self.supabase_url))
            .ok_or_else(|| Error::InvalidInput("Supabase URL must not be empty".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        self.supabase_url = url.trim_end_matches('/').to_string();

        self.supabase_anon_key = normalize_text_option(Some(self.supabase_anon_key))
            .ok_or_else(|| Error::InvalidInput("Supabase anon key must not be empty".to_string()))?;
        self.storage_bucket = normalize_text_option(Some(self.storage_bucket))
            .map_or_else(default_storage_bucket, |bucket| {
                bucket.trim_matches('/').to_string()
            });
        if self.location_poll_interval_secs == 0 {
            self.location_poll_interval_secs = DEFAULT_LOCATION_POLL_SECS;
        }
        Ok(self)
    }
}

fn default_storage_bucket() -> String {
    DEFAULT_STORAGE_BUCKET.to_string()
}

const fn default_location_poll_secs() -> u64 {
    DEFAULT_LOCATION_POLL_SECS
}

const fn default_marker_stale_secs() -> u64 {
    DEFAULT_MARKER_STALE_SECS
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<ClientConfig>> {
    let read = |key| normalize_text_option(lookup(key));
    let url = read(ENV_SUPABASE_URL);
    let anon_key = read(ENV_SUPABASE_ANON_KEY);
    let bucket = read(ENV_STORAGE_BUCKET);
    let poll = read(ENV_LOCATION_POLL_SECS);
    let stale = read(ENV_MARKER_STALE_SECS);

    let any_present = url.is_some()
        || anon_key.is_some()
        || bucket.is_some()
        || poll.is_some()
        || stale.is_some();
    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if url.is_none() {
        missing.push(ENV_SUPABASE_URL);
    }
    if anon_key.is_none() {
        missing.push(ENV_SUPABASE_ANON_KEY);
    }
    let (Some(url), Some(anon_key)) = (url, anon_key) else {
        return Err(Error::InvalidInput(format!(
            "Hearth configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    };

    let mut config = ClientConfig::new(&url, &anon_key)?;
    if let Some(bucket) = bucket {
        config.storage_bucket = bucket.trim_matches('/').to_string();
    }
    if let Some(poll) = poll {
        config.location_poll_interval_secs = parse_seconds(ENV_LOCATION_POLL_SECS, &poll)?;
    }
    if let Some(stale) = stale {
        config.marker_stale_after_secs = parse_seconds(ENV_MARKER_STALE_SECS, &stale)?;
    }
    config.validated().map(Some)
}

fn parse_seconds(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a whole number of seconds")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<ClientConfig>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_none_returns_none() {
        assert!(parse_from_map(&HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_url_and_key() {
        let mut map = HashMap::new();
        map.insert(ENV_STORAGE_BUCKET, "photos");

        match parse_from_map(&map).unwrap_err() {
            Error::InvalidInput(message) => {
                assert!(message.contains(ENV_SUPABASE_URL));
                assert!(message.contains(ENV_SUPABASE_ANON_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_applies_overrides_and_normalizes_url() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "https://demo.supabase.co/");
        map.insert(ENV_SUPABASE_ANON_KEY, " anon ");
        map.insert(ENV_STORAGE_BUCKET, "/photos/");
        map.insert(ENV_LOCATION_POLL_SECS, "2");
        map.insert(ENV_MARKER_STALE_SECS, "0");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.supabase_url, "https://demo.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon");
        assert_eq!(config.storage_bucket, "photos");
        assert_eq!(config.location_poll_interval(), Duration::from_secs(2));
        assert_eq!(config.marker_stale_after(), None);
    }

    #[test]
    fn parse_config_rejects_bad_numbers_and_urls() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "demo.supabase.co");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");
        assert!(parse_from_map(&map).is_err());

        map.insert(ENV_SUPABASE_URL, "https://demo.supabase.co");
        map.insert(ENV_LOCATION_POLL_SECS, "soon");
        assert!(parse_from_map(&map).is_err());
    }

    #[test]
    fn load_from_path_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"supabase_url": "https://demo.supabase.co", "supabase_anon_key": "anon"}"#,
        )
        .unwrap();

        let config = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(config.storage_bucket, "media");
        assert_eq!(
            config.marker_stale_after(),
            Some(Duration::from_secs(DEFAULT_MARKER_STALE_SECS))
        );
    }

    #[test]
    fn load_from_path_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"supabase_url": "https://demo.supabase.co", "supabase_anon_key": "anon", "turbo": true}"#,
        )
        .unwrap();
        assert!(ClientConfig::load_from_path(&path).is_err());
    }
}
