//! Participant id to marker bookkeeping.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::surface::{LatLngBounds, MapSurface, MarkerHandle, MarkerIcon, MarkerSpec, FIT_PADDING};
use crate::format::format_time_ago;
use crate::models::{LiveLocation, UserId};
use crate::realtime::{ChangeEvent, ChangeKind};
use crate::util::escape_html;
use crate::{Error, Result};

/// What a single reconciliation step did to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerChange {
    Added(UserId),
    Moved(UserId),
    Removed(UserId),
}

#[derive(Debug, Clone)]
struct TrackedMarker {
    handle: MarkerHandle,
    location: LiveLocation,
}

/// Keeps exactly one marker per participant.
///
/// Markers are created on first sighting and mutated in place afterwards.
/// They go away only on a delete notification, a staleness sweep, or
/// teardown. The view is fitted to the markers once, after the first
/// non-empty snapshot.
#[derive(Debug, Default)]
pub struct MarkerReconciler {
    markers: HashMap<UserId, TrackedMarker>,
    fitted: bool,
}

impl MarkerReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the initial bulk read, then fit the view if anything is shown.
    pub fn load_snapshot<M: MapSurface>(
        &mut self,
        map: &mut M,
        locations: impl IntoIterator<Item = LiveLocation>,
        now: DateTime<Utc>,
    ) -> Vec<MarkerChange> {
        let changes: Vec<MarkerChange> = locations
            .into_iter()
            .map(|location| self.apply_location(map, location, now))
            .collect();

        if !self.fitted {
            let bounds = LatLngBounds::from_points(
                self.markers.values().map(|marker| marker.location.position()),
            );
            if let Some(bounds) = bounds {
                map.fit_bounds(bounds.pad(FIT_PADDING));
                self.fitted = true;
            }
        }
        changes
    }

    /// Show one participant at their latest position. Never re-fits.
    pub fn apply_location<M: MapSurface>(
        &mut self,
        map: &mut M,
        location: LiveLocation,
        now: DateTime<Utc>,
    ) -> MarkerChange {
        let spec = marker_spec(&location, now);
        let id = location.id;
        if let Some(tracked) = self.markers.get_mut(&id) {
            map.update_marker(tracked.handle, &spec);
            tracked.location = location;
            tracing::debug!("Moved marker for {id}");
            MarkerChange::Moved(id)
        } else {
            let handle = map.add_marker(&spec);
            self.markers.insert(id, TrackedMarker { handle, location });
            tracing::debug!("Added marker for {id}");
            MarkerChange::Added(id)
        }
    }

    /// Apply one change-feed notification for the locations table.
    ///
    /// Returns `Ok(None)` when the event changes nothing on the map.
    pub fn apply_change<M: MapSurface>(
        &mut self,
        map: &mut M,
        event: &ChangeEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<MarkerChange>> {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let location: LiveLocation = event.new_record()?.ok_or_else(|| {
                    Error::Backend("location change arrived without a row image".to_string())
                })?;
                Ok(Some(self.apply_location(map, location, now)))
            }
            ChangeKind::Delete => {
                let id = event
                    .row_id()
                    .and_then(Value::as_str)
                    .and_then(|id| id.parse::<UserId>().ok());
                Ok(id.and_then(|id| self.remove(map, id)))
            }
        }
    }

    /// Drop one participant's marker, if shown.
    pub fn remove<M: MapSurface>(&mut self, map: &mut M, id: UserId) -> Option<MarkerChange> {
        let tracked = self.markers.remove(&id)?;
        map.remove_marker(tracked.handle);
        tracing::debug!("Removed marker for {id}");
        Some(MarkerChange::Removed(id))
    }

    /// Remove markers whose last update is older than `stale_after` and
    /// refresh the relative-time label of the rest.
    pub fn prune_stale<M: MapSurface>(
        &mut self,
        map: &mut M,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Vec<UserId> {
        let limit = i64::try_from(stale_after.as_secs()).unwrap_or(i64::MAX);
        let mut stale: Vec<UserId> = self
            .markers
            .iter()
            .filter(|(_, tracked)| {
                now.signed_duration_since(tracked.location.updated_at)
                    .num_seconds()
                    > limit
            })
            .map(|(id, _)| *id)
            .collect();
        stale.sort();

        for id in &stale {
            self.remove(map, *id);
        }
        if !stale.is_empty() {
            tracing::info!("Swept {} stale markers", stale.len());
        }
        self.refresh_labels(map, now);
        stale
    }

    /// Re-render every popup against `now`.
    pub fn refresh_labels<M: MapSurface>(&self, map: &mut M, now: DateTime<Utc>) {
        for tracked in self.markers.values() {
            map.update_marker(tracked.handle, &marker_spec(&tracked.location, now));
        }
    }

    /// Forget every marker and release the surface.
    pub fn teardown<M: MapSurface>(&mut self, map: &mut M) {
        let count = self.markers.len();
        self.markers.clear();
        self.fitted = false;
        map.detach();
        tracing::info!("Live map torn down ({count} markers cleared)");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[must_use]
    pub fn location(&self, id: UserId) -> Option<&LiveLocation> {
        self.markers.get(&id).map(|tracked| &tracked.location)
    }

    #[must_use]
    pub fn handle(&self, id: UserId) -> Option<MarkerHandle> {
        self.markers.get(&id).map(|tracked| tracked.handle)
    }

    /// Shown participants ordered by display name.
    #[must_use]
    pub fn locations(&self) -> Vec<&LiveLocation> {
        let mut locations: Vec<&LiveLocation> = self
            .markers
            .values()
            .map(|tracked| &tracked.location)
            .collect();
        locations.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        locations
    }
}

/// `<b>name</b>` with an "updated X ago" line.
#[must_use]
pub fn popup_html(location: &LiveLocation, now: DateTime<Utc>) -> String {
    format!(
        "<b>{}</b><br><small>updated {}</small>",
        escape_html(&location.display_name),
        format_time_ago(location.updated_at, now)
    )
}

fn marker_spec(location: &LiveLocation, now: DateTime<Utc>) -> MarkerSpec {
    MarkerSpec {
        position: location.position(),
        icon: MarkerIcon::for_url(location.icon_or_placeholder()),
        popup_html: popup_html(location, now),
    }
}
