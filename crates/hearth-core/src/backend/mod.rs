//! Relational data access against the hosted backend.

mod memory;
mod query;
mod rest;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

pub use memory::InMemoryBackend;
pub use query::{CompareOp, Filter, OrderBy, Query};
pub use rest::RestBackend;

/// Every table the client reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Locations,
    Profiles,
    Gallery,
    Notes,
    Timeline,
    Favorites,
    Tasks,
    WorkNotes,
    FinancialReminders,
    Documents,
    CalendarEvents,
}

impl Table {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Profiles => "profiles",
            Self::Gallery => "gallery",
            Self::Notes => "notes",
            Self::Timeline => "timeline",
            Self::Favorites => "favorites",
            Self::Tasks => "tasks",
            Self::WorkNotes => "work_notes",
            Self::FinancialReminders => "financial_reminders",
            Self::Documents => "documents",
            Self::CalendarEvents => "calendar_events",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-table CRUD with filter/order composition.
///
/// Rows travel as JSON objects; the typed helpers convert at the edge.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Read rows matching the query.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Patch every row matching the filter; returns how many changed.
    async fn update(&self, table: Table, filter: &Query, patch: Value) -> Result<usize>;

    /// Insert or replace one row keyed by its `id`.
    async fn upsert(&self, table: Table, row: Value) -> Result<()>;

    /// Delete every row matching the filter; returns how many were removed.
    async fn delete(&self, table: Table, filter: &Query) -> Result<usize>;

    /// Typed read.
    async fn fetch<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<Vec<T>> {
        self.select(table, query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect()
    }

    /// Typed read of exactly one row.
    async fn fetch_one<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<T> {
        let row = self
            .select(table, &query.clone().limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no matching row in {table}")))?;
        Ok(serde_json::from_value(row)?)
    }

    /// Typed read of at most one row.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        table: Table,
        query: &Query,
    ) -> Result<Option<T>> {
        match self.fetch_one(table, query).await {
            Ok(row) => Ok(Some(row)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Typed insert returning the stored record.
    async fn insert_record<R: Serialize, T: DeserializeOwned>(
        &self,
        table: Table,
        record: &R,
    ) -> Result<T> {
        let stored = self.insert(table, serde_json::to_value(record)?).await?;
        Ok(serde_json::from_value(stored)?)
    }
}

/// Filter selecting one row by primary key.
pub fn by_id(id: impl Serialize) -> Query {
    Query::new().eq("id", id)
}

/// Fail when a write that targeted one row touched none.
pub(crate) fn expect_affected(table: Table, affected: usize, id: impl fmt::Display) -> Result<()> {
    if affected == 0 {
        Err(Error::NotFound(format!("{table} row {id}")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_match_backend_schema() {
        assert_eq!(Table::FinancialReminders.as_str(), "financial_reminders");
        assert_eq!(Table::CalendarEvents.to_string(), "calendar_events");
    }

    #[tokio::test]
    async fn typed_helpers_convert_rows() {
        let backend = InMemoryBackend::new();
        backend
            .insert(Table::Favorites, serde_json::json!({"item": "rainy sundays"}))
            .await
            .unwrap();

        let favorite: crate::models::Favorite = backend
            .fetch_one(Table::Favorites, &Query::new())
            .await
            .unwrap();
        assert_eq!(favorite.item, "rainy sundays");

        let missing: Option<crate::models::Favorite> = backend
            .fetch_optional(Table::Favorites, &by_id(99))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
