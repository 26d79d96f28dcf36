//! Publishing the signed-in participant's position.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use super::GeolocationError;
use crate::backend::{Backend, Table};
use crate::models::{GeoPoint, UserId, PLACEHOLDER_ICON_URL};
use crate::notice::Notice;
use crate::Result;

/// One position fix from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub point: GeoPoint,
    pub accuracy_m: Option<f64>,
    pub taken_at: DateTime<Utc>,
}

/// A stream of position fixes (the device's geolocation watch).
#[allow(async_fn_in_trait)]
pub trait PositionSource {
    /// Wait for the next fix. `None` once the source has nothing more.
    async fn next_position(&mut self) -> Option<std::result::Result<Position, GeolocationError>>;
}

/// Position source that replays a fixed list of fixes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPositions {
    steps: VecDeque<std::result::Result<Position, GeolocationError>>,
    delay: Option<Duration>,
}

impl ScriptedPositions {
    pub fn new(
        steps: impl IntoIterator<Item = std::result::Result<Position, GeolocationError>>,
    ) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            delay: None,
        }
    }

    /// Wait this long before yielding each step.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl PositionSource for ScriptedPositions {
    async fn next_position(&mut self) -> Option<std::result::Result<Position, GeolocationError>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.steps.pop_front()
    }
}

/// Why a sharing session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingEnd {
    /// The user asked to stop.
    Stopped,
    /// The position source finished.
    SourceExhausted,
    /// Geolocation failed; the notice tells the user what to do.
    Failed(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingReport {
    pub published: usize,
    pub failed_writes: usize,
    pub end: SharingEnd,
}

#[derive(Debug, Serialize)]
struct LocationRow<'a> {
    id: UserId,
    lat: f64,
    lng: f64,
    display_name: &'a str,
    icon_url: &'a str,
    updated_at: DateTime<Utc>,
}

/// Upserts the participant's `locations` row for every fix.
#[derive(Debug)]
pub struct LocationSharing<'a, B> {
    backend: &'a B,
    user_id: UserId,
    display_name: String,
    icon_url: Option<String>,
}

impl<'a, B: Backend> LocationSharing<'a, B> {
    pub fn new(
        backend: &'a B,
        user_id: UserId,
        display_name: impl Into<String>,
        icon_url: Option<String>,
    ) -> Self {
        Self {
            backend,
            user_id,
            display_name: display_name.into(),
            icon_url,
        }
    }

    /// Write one fix.
    pub async fn publish(&self, position: &Position) -> Result<()> {
        let row = LocationRow {
            id: self.user_id,
            lat: position.point.lat,
            lng: position.point.lng,
            display_name: &self.display_name,
            icon_url: self
                .icon_url
                .as_deref()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(PLACEHOLDER_ICON_URL),
            updated_at: position.taken_at,
        };
        self.backend
            .upsert(Table::Locations, serde_json::to_value(row)?)
            .await
    }

    /// Share until stopped, the source ends, or geolocation fails.
    ///
    /// A failed write is logged and sharing continues with the next fix.
    /// Dropping the stop sender counts as a stop request.
    pub async fn run<P: PositionSource>(
        &self,
        source: &mut P,
        mut stop: oneshot::Receiver<()>,
    ) -> SharingReport {
        let mut published = 0;
        let mut failed_writes = 0;
        tracing::info!("Location sharing started for {}", self.user_id);

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => break SharingEnd::Stopped,
                next = source.next_position() => next,
            };

            match next {
                None => break SharingEnd::SourceExhausted,
                Some(Err(error)) => {
                    break SharingEnd::Failed(Notice::from_error(
                        "Location sharing",
                        &error.into(),
                    ));
                }
                Some(Ok(position)) => match self.publish(&position).await {
                    Ok(()) => {
                        published += 1;
                        tracing::debug!(
                            "Shared position {:.5}, {:.5}",
                            position.point.lat,
                            position.point.lng
                        );
                    }
                    Err(error) => {
                        failed_writes += 1;
                        tracing::warn!("Failed to publish location: {error}");
                    }
                },
            }
        };

        tracing::info!("Location sharing ended: {end:?}");
        SharingReport {
            published,
            failed_writes,
            end,
        }
    }
}
