//! Live location and profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Icon used when a participant has not uploaded one yet.
pub const PLACEHOLDER_ICON_URL: &str = "https://via.placeholder.com/50";

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One participant's last shared position. At most one row per participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLocation {
    /// Participant id (same as the profile id)
    pub id: UserId,
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LiveLocation {
    #[must_use]
    pub const fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Icon to render, falling back to the placeholder.
    #[must_use]
    pub fn icon_or_placeholder(&self) -> &str {
        self.icon_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(PLACEHOLDER_ICON_URL)
    }
}

/// Public profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(icon_url: Option<&str>) -> LiveLocation {
        serde_json::from_value(serde_json::json!({
            "id": "0190b5a4-5a4e-7c1e-9f39-6d0b3f1c2a11",
            "lat": 48.85,
            "lng": 2.35,
            "display_name": "Ana",
            "icon_url": icon_url,
            "updated_at": "2024-06-01T12:00:00+00:00"
        }))
        .unwrap()
    }

    #[test]
    fn parses_backend_row() {
        let row = location(Some("https://cdn.example.com/a.png"));
        assert_eq!(row.position(), GeoPoint::new(48.85, 2.35));
        assert_eq!(row.icon_or_placeholder(), "https://cdn.example.com/a.png");
    }

    #[test]
    fn missing_icon_uses_placeholder() {
        assert_eq!(location(None).icon_or_placeholder(), PLACEHOLDER_ICON_URL);
        assert_eq!(location(Some("  ")).icon_or_placeholder(), PLACEHOLDER_ICON_URL);
    }
}
