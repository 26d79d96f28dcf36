use std::time::Duration;

use chrono::{DateTime, Utc};

use super::reconciler::{MarkerChange, MarkerReconciler};
use super::surface::MapSurface;
use crate::backend::{Backend, Query, Table};
use crate::models::{LiveLocation, UserId};
use crate::realtime::{ChangeEvent, ChangeFeed, Subscription};
use crate::Result;

/// The live map's lifecycle: one map, one subscription, scoped to the
/// time the view is shown.
pub struct LiveMapView<M> {
    map: Option<M>,
    reconciler: MarkerReconciler,
    subscription: Option<Subscription>,
    stale_after: Option<Duration>,
}

impl<M: MapSurface + Default> LiveMapView<M> {
    #[must_use]
    pub fn new(stale_after: Option<Duration>) -> Self {
        Self {
            map: None,
            reconciler: MarkerReconciler::new(),
            subscription: None,
            stale_after,
        }
    }

    /// Create the map on first use; later calls return the same one.
    pub fn init_map(&mut self) -> &mut M {
        self.map.get_or_insert_with(|| {
            tracing::debug!("Initializing live map");
            M::default()
        })
    }

    /// Subscribe to location changes and draw the current snapshot.
    ///
    /// The subscription is taken before the snapshot read so no change
    /// falls in between. Entering twice is a no-op.
    pub async fn enter<B: Backend, F: ChangeFeed>(
        &mut self,
        backend: &B,
        feed: &F,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if self.subscription.is_some() {
            return Ok(self.reconciler.len());
        }

        let subscription = feed.subscribe(Table::Locations)?;
        let snapshot: Vec<LiveLocation> = backend
            .fetch(Table::Locations, &Query::new().select("*"))
            .await?;

        self.init_map();
        if let Some(map) = self.map.as_mut() {
            self.reconciler.load_snapshot(map, snapshot, now);
        }
        self.subscription = Some(subscription);
        Ok(self.reconciler.len())
    }

    /// Wait for and apply the next location change.
    ///
    /// Undecodable rows are logged and skipped. `None` when the view is not
    /// entered or the feed has closed.
    pub async fn pump(&mut self, now: DateTime<Utc>) -> Option<MarkerChange> {
        loop {
            let event = self.subscription.as_mut()?.next().await?;
            if let Some(change) = self.apply(&event, now) {
                return Some(change);
            }
        }
    }

    /// Apply every change already buffered, without waiting.
    pub fn drain(&mut self, now: DateTime<Utc>) -> Vec<MarkerChange> {
        let mut changes = Vec::new();
        while let Some(event) = self
            .subscription
            .as_mut()
            .and_then(Subscription::try_next)
        {
            changes.extend(self.apply(&event, now));
        }
        changes
    }

    /// Drop markers that have not been updated within the staleness window.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<UserId> {
        let (Some(map), Some(stale_after)) = (self.map.as_mut(), self.stale_after) else {
            return Vec::new();
        };
        self.reconciler.prune_stale(map, now, stale_after)
    }

    /// Unsubscribe and tear the map down.
    pub fn exit(&mut self) {
        self.subscription = None;
        if let Some(mut map) = self.map.take() {
            self.reconciler.teardown(&mut map);
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    #[must_use]
    pub const fn map(&self) -> Option<&M> {
        self.map.as_ref()
    }

    #[must_use]
    pub const fn reconciler(&self) -> &MarkerReconciler {
        &self.reconciler
    }

    fn apply(
        &mut self,
        event: &ChangeEvent,
        now: DateTime<Utc>,
    ) -> Option<MarkerChange> {
        let map = self.map.as_mut()?;
        match self.reconciler.apply_change(map, event, now) {
            Ok(change) => change,
            Err(error) => {
                tracing::warn!("Skipping location change: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::live_map::reconciler::tests::{location, now, participant};
    use crate::live_map::HeadlessMap;

    fn seeded() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                Table::Locations,
                vec![
                    serde_json::to_value(location(1, 10.0, 10.0, 0)).unwrap(),
                    serde_json::to_value(location(2, 12.0, 14.0, 0)).unwrap(),
                ],
            )
            .unwrap();
        backend
    }

    #[test]
    fn init_map_is_idempotent() {
        let mut view: LiveMapView<HeadlessMap> = LiveMapView::new(None);
        view.init_map().zoom = 9;
        assert_eq!(view.init_map().zoom, 9);
    }

    #[tokio::test]
    async fn enter_draws_snapshot_and_subscribes() {
        let backend = seeded();
        let mut view: LiveMapView<HeadlessMap> = LiveMapView::new(None);

        assert_eq!(view.enter(&backend, &backend, now()).await.unwrap(), 2);
        assert!(view.is_active());
        assert_eq!(backend.subscriber_count(), 1);
        assert_eq!(view.map().unwrap().fits().len(), 1);

        // Entering again neither resubscribes nor refits.
        view.enter(&backend, &backend, now()).await.unwrap();
        assert_eq!(backend.subscriber_count(), 1);
        assert_eq!(view.map().unwrap().fits().len(), 1);
    }

    #[tokio::test]
    async fn feed_updates_move_markers_in_place() {
        let backend = seeded();
        let mut view: LiveMapView<HeadlessMap> = LiveMapView::new(None);
        view.enter(&backend, &backend, now()).await.unwrap();

        backend
            .upsert(
                Table::Locations,
                serde_json::to_value(location(1, 11.0, 11.0, 0)).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            view.pump(now()).await,
            Some(MarkerChange::Moved(participant(1)))
        );

        let map = view.map().unwrap();
        assert_eq!(map.marker_count(), 2);
        assert_eq!(map.adds(), 2);
        assert_eq!(map.fits().len(), 1);
        assert_eq!(
            view.reconciler().location(participant(1)).unwrap().lat,
            11.0
        );
    }

    #[tokio::test]
    async fn exit_releases_subscription_and_map() {
        let backend = seeded();
        let mut view: LiveMapView<HeadlessMap> = LiveMapView::new(None);
        view.enter(&backend, &backend, now()).await.unwrap();

        view.exit();
        assert!(!view.is_active());
        assert_eq!(backend.subscriber_count(), 0);
        assert!(view.map().is_none());
        assert!(view.reconciler().is_empty());
        assert_eq!(view.pump(now()).await, None);
    }

    #[tokio::test]
    async fn sweep_uses_configured_threshold() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                Table::Locations,
                vec![
                    serde_json::to_value(location(1, 1.0, 1.0, 60)).unwrap(),
                    serde_json::to_value(location(2, 2.0, 2.0, 4_000)).unwrap(),
                ],
            )
            .unwrap();

        let mut view: LiveMapView<HeadlessMap> =
            LiveMapView::new(Some(Duration::from_secs(1_800)));
        view.enter(&backend, &backend, now()).await.unwrap();
        view.drain(now());

        assert_eq!(view.sweep(now()), vec![participant(2)]);
        assert_eq!(view.reconciler().len(), 1);

        let mut unbounded: LiveMapView<HeadlessMap> = LiveMapView::new(None);
        unbounded.enter(&backend, &backend, now()).await.unwrap();
        assert!(unbounded.sweep(now()).is_empty());
    }
}
