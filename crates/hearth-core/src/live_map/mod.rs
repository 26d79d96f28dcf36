//! Shared live location map.
//!
//! Each participant publishes their position to the `locations` table; every
//! open map keeps one marker per participant in sync with that table.

mod reconciler;
mod sharing;
mod surface;
mod view;

use thiserror::Error;

pub use reconciler::{popup_html, MarkerChange, MarkerReconciler};
pub use sharing::{
    LocationSharing, Position, PositionSource, ScriptedPositions, SharingEnd, SharingReport,
};
pub use surface::{
    HeadlessMap, LatLngBounds, MapSurface, MarkerHandle, MarkerIcon, MarkerSpec, DEFAULT_CENTER,
    DEFAULT_ZOOM, FIT_PADDING,
};
pub use view::LiveMapView;

/// Why the device could not produce a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position")]
    Timeout,
}

impl GeolocationError {
    /// What the sharing user can do about it.
    #[must_use]
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location sharing stopped: allow location access for this app and start sharing again."
            }
            Self::PositionUnavailable => {
                "Location sharing stopped: your position is unavailable. Check that location services are on."
            }
            Self::Timeout => {
                "Location sharing stopped: finding your position took too long. Try again with a clearer view of the sky."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_geolocation_error_has_guidance() {
        for error in [
            GeolocationError::PermissionDenied,
            GeolocationError::PositionUnavailable,
            GeolocationError::Timeout,
        ] {
            assert!(error.guidance().starts_with("Location sharing stopped"));
        }
    }
}
