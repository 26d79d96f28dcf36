//! Row-level change feed.
//!
//! A [`Subscription`] is an owned handle: holding it keeps the feed open and
//! dropping it unsubscribes. Views acquire one on entry and drop it on exit.

mod poll;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::backend::Table;
use crate::Result;

pub use poll::PollingFeed;

/// Buffered notifications per subscriber before the oldest are dropped.
pub(crate) const FEED_CAPACITY: usize = 256;

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// Row image after the change (absent for deletes).
    pub new: Option<Value>,
    /// Row image before the change, when known.
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// Decode the new row image.
    pub fn new_record<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.new
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Primary key of the affected row, from whichever image carries it.
    #[must_use]
    pub fn row_id(&self) -> Option<&Value> {
        self.new
            .as_ref()
            .and_then(|row| row.get("id"))
            .or_else(|| self.old.as_ref().and_then(|row| row.get("id")))
    }
}

/// Source of change notifications for a named table.
pub trait ChangeFeed {
    fn subscribe(&self, table: Table) -> Result<Subscription>;
}

/// Live subscription to one table's changes.
pub struct Subscription {
    table: Table,
    receiver: broadcast::Receiver<ChangeEvent>,
    poller: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(table: Table, receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        tracing::info!("Subscribed to {table} changes");
        Self {
            table,
            receiver,
            poller: None,
        }
    }

    /// Tie a background poller's lifetime to this subscription.
    pub(crate) fn with_poller(mut self, poller: JoinHandle<()>) -> Self {
        self.poller = Some(poller);
        self
    }

    #[must_use]
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next change to this table. `None` once the feed closes.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("{} change feed lagged; skipped {skipped} events", self.table);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered change, without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("{} change feed lagged; skipped {skipped} events", self.table);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        tracing::info!("Unsubscribed from {} changes", self.table);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("table", &self.table)
            .field("polling", &self.poller.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{Backend, InMemoryBackend};

    #[tokio::test]
    async fn subscription_only_yields_its_table() {
        let backend = InMemoryBackend::new();
        let mut subscription = backend.subscribe(Table::Locations).unwrap();

        backend
            .insert(Table::Notes, json!({"content": "hi"}))
            .await
            .unwrap();
        backend
            .upsert(Table::Locations, json!({"id": "p1", "lat": 1.0, "lng": 2.0}))
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.table, Table::Locations);
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.row_id(), Some(&json!("p1")));
        assert!(subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn dropping_subscription_releases_receiver() {
        let backend = InMemoryBackend::new();
        let subscription = backend.subscribe(Table::Locations).unwrap();
        assert_eq!(backend.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(backend.subscriber_count(), 0);
    }
}
