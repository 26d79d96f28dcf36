use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeFeed, ChangeKind, Subscription, FEED_CAPACITY};
use crate::backend::{Backend, Query, RestBackend, Table};
use crate::Result;

/// Change feed for the REST backend built on periodic re-reads.
///
/// The first read is the baseline and emits nothing. Each later read is
/// diffed against the previous one by `id`.
#[derive(Clone)]
pub struct PollingFeed {
    backend: RestBackend,
    interval: Duration,
}

impl PollingFeed {
    #[must_use]
    pub const fn new(backend: RestBackend, interval: Duration) -> Self {
        Self { backend, interval }
    }
}

impl ChangeFeed for PollingFeed {
    /// Must be called from within a tokio runtime.
    fn subscribe(&self, table: Table) -> Result<Subscription> {
        let (sender, receiver) = broadcast::channel(FEED_CAPACITY);
        let backend = self.backend.clone();
        let interval = self.interval;
        let poller = tokio::spawn(async move {
            poll_table(backend, table, interval, sender).await;
        });
        Ok(Subscription::new(table, receiver).with_poller(poller))
    }
}

async fn poll_table(
    backend: RestBackend,
    table: Table,
    interval: Duration,
    sender: broadcast::Sender<ChangeEvent>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut previous: Option<HashMap<String, Value>> = None;

    loop {
        ticker.tick().await;
        let rows = match backend.select(table, &Query::new()).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!("Polling {table} failed: {error}");
                continue;
            }
        };
        let current = index_rows(rows);

        if let Some(previous) = previous.as_ref() {
            for event in diff_rows(table, previous, &current) {
                if sender.send(event).is_err() {
                    tracing::debug!("No listeners left for {table}; stopping poller");
                    return;
                }
            }
        }
        previous = Some(current);
    }
}

fn index_rows(rows: Vec<Value>) -> HashMap<String, Value> {
    rows.into_iter()
        .filter_map(|row| {
            let key = match row.get("id")? {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            };
            Some((key, row))
        })
        .collect()
}

fn diff_rows(
    table: Table,
    previous: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    let mut keys: Vec<&String> = current.keys().collect();
    keys.sort();

    for key in keys {
        let row = &current[key];
        match previous.get(key) {
            None => events.push(ChangeEvent {
                table,
                kind: ChangeKind::Insert,
                new: Some(row.clone()),
                old: None,
            }),
            Some(old) if old != row => events.push(ChangeEvent {
                table,
                kind: ChangeKind::Update,
                new: Some(row.clone()),
                old: Some(old.clone()),
            }),
            Some(_) => {}
        }
    }

    let mut vanished: Vec<&String> = previous
        .keys()
        .filter(|key| !current.contains_key(*key))
        .collect();
    vanished.sort();
    for key in vanished {
        events.push(ChangeEvent {
            table,
            kind: ChangeKind::Delete,
            new: None,
            old: previous.get(key).cloned(),
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn diff_reports_inserts_updates_and_deletes() {
        let previous = index_rows(vec![
            json!({"id": "a", "lat": 1.0}),
            json!({"id": "b", "lat": 2.0}),
            json!({"id": "c", "lat": 3.0}),
        ]);
        let current = index_rows(vec![
            json!({"id": "a", "lat": 1.0}),
            json!({"id": "b", "lat": 2.5}),
            json!({"id": "d", "lat": 4.0}),
        ]);

        let events = diff_rows(Table::Locations, &previous, &current);
        let summary: Vec<(ChangeKind, Option<&Value>)> = events
            .iter()
            .map(|event| (event.kind, event.row_id()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::Update, Some(&json!("b"))),
                (ChangeKind::Insert, Some(&json!("d"))),
                (ChangeKind::Delete, Some(&json!("c"))),
            ]
        );
    }

    #[test]
    fn rows_without_ids_are_ignored() {
        let rows = index_rows(vec![json!({"item": "tea"}), json!({"id": 7, "item": "jam"})]);
        assert_eq!(rows.len(), 1);
        assert!(rows.contains_key("7"));
    }
}
