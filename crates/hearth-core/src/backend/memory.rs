//! In-process backend used by tests and offline demos.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::query::compare_values;
use super::{Backend, Query, Table};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind, Subscription, FEED_CAPACITY};
use crate::{Error, Result};

#[derive(Default)]
struct State {
    tables: HashMap<Table, Vec<Value>>,
    next_id: HashMap<Table, i64>,
    failing: HashSet<Table>,
}

struct Inner {
    state: Mutex<State>,
    changes: broadcast::Sender<ChangeEvent>,
}

/// Thread-safe in-memory tables with change notifications.
///
/// Ids are assigned per table by auto-increment when a row has none, and
/// `created_at` is stamped on insert. Writes to a table can be made to fail
/// with [`InMemoryBackend::fail_writes`].
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                changes,
            }),
        }
    }

    /// Load rows without emitting change notifications.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) -> Result<()> {
        let mut state = self.lock()?;
        for row in rows {
            let row = prepare_insert(&mut state, table, row)?;
            state.tables.entry(table).or_default().push(row);
        }
        Ok(())
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: Table) -> Result<Vec<Value>> {
        Ok(self
            .lock()?
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default())
    }

    /// Make every write to `table` fail until switched back off.
    pub fn fail_writes(&self, table: Table, failing: bool) -> Result<()> {
        let mut state = self.lock()?;
        if failing {
            state.failing.insert(table);
        } else {
            state.failing.remove(&table);
        }
        Ok(())
    }

    /// Open change-feed receivers across all tables.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.inner
            .state
            .lock()
            .map_err(|error| Error::Backend(format!("in-memory state poisoned: {error}")))
    }

    fn writable(&self, table: Table) -> Result<MutexGuard<'_, State>> {
        let state = self.lock()?;
        if state.failing.contains(&table) {
            return Err(Error::Backend(format!(
                "simulated write failure on {table}"
            )));
        }
        Ok(state)
    }

    fn publish(&self, table: Table, kind: ChangeKind, new: Option<Value>, old: Option<Value>) {
        // No receivers is not an error.
        let _ = self.inner.changes.send(ChangeEvent {
            table,
            kind,
            new,
            old,
        });
    }
}

impl Backend for InMemoryBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let state = self.lock()?;
        Ok(state
            .tables
            .get(&table)
            .map(|rows| query.apply(rows))
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let stored = {
            let mut state = self.writable(table)?;
            let row = prepare_insert(&mut state, table, row)?;
            state.tables.entry(table).or_default().push(row.clone());
            row
        };
        tracing::debug!("Inserted row into {table}");
        self.publish(table, ChangeKind::Insert, Some(stored.clone()), None);
        Ok(stored)
    }

    async fn update(&self, table: Table, filter: &Query, patch: Value) -> Result<usize> {
        let Value::Object(patch) = patch else {
            return Err(Error::InvalidInput("update patch must be an object".to_string()));
        };

        let changes = {
            let mut state = self.writable(table)?;
            let rows = state.tables.entry(table).or_default();
            let mut changes = Vec::new();
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                let old = row.clone();
                merge_into(row, &patch);
                changes.push((old, row.clone()));
            }
            changes
        };

        let affected = changes.len();
        for (old, new) in changes {
            self.publish(table, ChangeKind::Update, Some(new), Some(old));
        }
        Ok(affected)
    }

    async fn upsert(&self, table: Table, row: Value) -> Result<()> {
        let Value::Object(fields) = row else {
            return Err(Error::InvalidInput("upsert row must be an object".to_string()));
        };
        let Some(id) = fields.get("id").filter(|id| !id.is_null()).cloned() else {
            return Err(Error::InvalidInput("upsert row requires an id".to_string()));
        };

        let (kind, new, old) = {
            let mut state = self.writable(table)?;
            let existing = state.tables.entry(table).or_default().iter_mut().find(|row| {
                row.get("id")
                    .and_then(|current| compare_values(current, &id))
                    .is_some_and(std::cmp::Ordering::is_eq)
            });

            if let Some(existing) = existing {
                let old = existing.clone();
                merge_into(existing, &fields);
                (ChangeKind::Update, existing.clone(), Some(old))
            } else {
                let row = prepare_insert(&mut state, table, Value::Object(fields))?;
                state.tables.entry(table).or_default().push(row.clone());
                (ChangeKind::Insert, row, None)
            }
        };

        self.publish(table, kind, Some(new), old);
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Query) -> Result<usize> {
        if !filter.has_filters() {
            return Err(Error::InvalidInput(format!(
                "refusing to delete every row of {table}"
            )));
        }

        let removed = {
            let mut state = self.writable(table)?;
            let rows = state.tables.entry(table).or_default();
            let (removed, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|row| filter.matches(row));
            *rows = kept;
            removed
        };

        let affected = removed.len();
        for old in removed {
            self.publish(table, ChangeKind::Delete, None, Some(old));
        }
        Ok(affected)
    }
}

impl ChangeFeed for InMemoryBackend {
    fn subscribe(&self, table: Table) -> Result<Subscription> {
        Ok(Subscription::new(table, self.inner.changes.subscribe()))
    }
}

fn prepare_insert(state: &mut State, table: Table, row: Value) -> Result<Value> {
    let Value::Object(mut fields) = row else {
        return Err(Error::InvalidInput("inserted row must be an object".to_string()));
    };

    let next_id = state.next_id.entry(table).or_insert(1);
    match fields.get("id").and_then(Value::as_i64) {
        Some(explicit) => *next_id = (*next_id).max(explicit + 1),
        None if fields.get("id").map_or(true, Value::is_null) => {
            fields.insert("id".to_string(), Value::from(*next_id));
            *next_id += 1;
        }
        None => {}
    }

    fields
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    Ok(Value::Object(fields))
}

fn merge_into(row: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(fields) = row {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    }
}
