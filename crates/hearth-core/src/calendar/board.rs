use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use super::{
    compare_items, fetch_items, midnight, CalendarItem, EditSurface, ItemKey, ItemKind,
    VisibleRange,
};
use crate::backend::{by_id, expect_affected, Backend, Table};
use crate::models::{CalendarEvent, EventDraft, EventId, Task, UserId};
use crate::optimistic::apply_optimistic;
use crate::{Error, Result};

/// Calendar tab state: the items of the visible range and the open editor.
///
/// Drag, resize and delete change the local items first and restore them if
/// the write fails.
#[derive(Debug, Clone)]
pub struct CalendarBoard {
    user_id: UserId,
    range: Option<VisibleRange>,
    items: Vec<CalendarItem>,
    editor: Option<EditSurface>,
}

impl CalendarBoard {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            range: None,
            items: Vec::new(),
            editor: None,
        }
    }

    /// Show `range`, replacing the current items.
    pub async fn refetch<B: Backend>(&mut self, backend: &B, range: VisibleRange) -> Result<usize> {
        let items = fetch_items(backend, self.user_id, &range).await?;
        self.range = Some(range);
        self.items = items;
        Ok(self.items.len())
    }

    /// Re-read the current range, if one is shown.
    pub async fn reload<B: Backend>(&mut self, backend: &B) -> Result<usize> {
        match self.range {
            Some(range) => self.refetch(backend, range).await,
            None => Ok(0),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CalendarItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, key: ItemKey) -> Option<&CalendarItem> {
        self.items.iter().find(|item| item.key == key)
    }

    #[must_use]
    pub const fn range(&self) -> Option<VisibleRange> {
        self.range
    }

    #[must_use]
    pub const fn editor(&self) -> Option<&EditSurface> {
        self.editor.as_ref()
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Blank all-day event for a clicked date.
    pub fn open_date(&mut self, date: NaiveDate) -> &EditSurface {
        self.editor
            .insert(EditSurface::EventEditor(EventDraft::new(midnight(date), None, true)))
    }

    /// Blank event spanning a selected stretch of time.
    pub fn open_selection(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
    ) -> &EditSurface {
        self.editor
            .insert(EditSurface::EventEditor(EventDraft::new(start, Some(end), all_day)))
    }

    /// Open the editor that owns the clicked item.
    pub fn click(&mut self, key: ItemKey) -> Result<&EditSurface> {
        let surface = self
            .item(key)
            .map(CalendarItem::edit_surface)
            .ok_or_else(|| Error::NotFound(format!("calendar item {key}")))?;
        Ok(self.editor.insert(surface))
    }

    /// Drag an item to a new slot. Tasks only take the new date.
    pub async fn move_item<B: Backend>(
        &mut self,
        backend: &B,
        key: ItemKey,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.require(key)?;
        if key.kind == ItemKind::Event && end.is_some_and(|end| end < start) {
            return Err(Error::InvalidInput(
                "Event end cannot be before its start.".to_string(),
            ));
        }
        let patch = match key.kind {
            ItemKind::Task => json!({ "due_date": start.date_naive() }),
            ItemKind::Event => json!({ "start_time": start, "end_time": end }),
        };

        let write = async move {
            let affected = backend
                .update(key.kind.table(), &by_id(key.id), patch)
                .await?;
            expect_affected(key.kind.table(), affected, key.id)
        };
        let range = self.range;
        apply_optimistic(
            &mut self.items,
            |items| {
                if let Some(item) = items.iter_mut().find(|item| item.key == key) {
                    item.reschedule(start, end);
                }
                items.retain(|item| item.key != key || is_visible(range, item));
                items.sort_by(compare_items);
            },
            write,
        )
        .await
        .inspect_err(|error| tracing::warn!("Reverted move of {key}: {error}"))
    }

    /// Stretch an event's end. Tasks have no duration to resize.
    pub async fn resize_event<B: Backend>(
        &mut self,
        backend: &B,
        key: ItemKey,
        end: DateTime<Utc>,
    ) -> Result<()> {
        if key.kind == ItemKind::Task {
            return Err(Error::InvalidInput(
                "Tasks cannot be resized; drag them to another day instead.".to_string(),
            ));
        }
        let start = self.require(key)?.start;
        if end < start {
            return Err(Error::InvalidInput(
                "Event end cannot be before its start.".to_string(),
            ));
        }

        let write = async move {
            let affected = backend
                .update(Table::CalendarEvents, &by_id(key.id), json!({ "end_time": end }))
                .await?;
            expect_affected(Table::CalendarEvents, affected, key.id)
        };
        apply_optimistic(
            &mut self.items,
            |items| {
                if let Some(item) = items.iter_mut().find(|item| item.key == key) {
                    item.end = Some(end);
                }
            },
            write,
        )
        .await
        .inspect_err(|error| tracing::warn!("Reverted resize of {key}: {error}"))
    }

    /// Insert or update the event in the editor draft, then close the editor.
    pub async fn save_event<B: Backend>(&mut self, backend: &B, draft: &EventDraft) -> Result<()> {
        let row = draft.to_row(self.user_id)?;

        if let Some(id) = draft.id {
            let saved = CalendarEvent {
                id,
                title: row.title.clone(),
                start_time: row.start_time,
                end_time: row.end_time,
                all_day: row.all_day,
                color: Some(row.color.clone()),
                priority: Some(row.priority),
                category: row.category.clone(),
            };
            let write = async move {
                let affected = backend
                    .update(Table::CalendarEvents, &by_id(id), serde_json::to_value(&row)?)
                    .await?;
                expect_affected(Table::CalendarEvents, affected, id)
            };
            let range = self.range;
            apply_optimistic(
                &mut self.items,
                |items| {
                    items.retain(|item| item.key != ItemKey::event(id));
                    if range.is_none_or(|range| overlaps(&range, &saved)) {
                        items.push(CalendarItem::from_event(&saved));
                    }
                    items.sort_by(compare_items);
                },
                write,
            )
            .await?;
        } else {
            let created: CalendarEvent = backend
                .insert_record(Table::CalendarEvents, &row)
                .await?;
            tracing::debug!("Created calendar event {}", created.id);
            if self.range.is_none_or(|range| overlaps(&range, &created)) {
                self.items.push(CalendarItem::from_event(&created));
                self.items.sort_by(compare_items);
            }
        }

        self.editor = None;
        Ok(())
    }

    pub async fn delete_event<B: Backend>(&mut self, backend: &B, id: EventId) -> Result<()> {
        let key = ItemKey::event(id);
        let write = async move {
            let affected = backend.delete(Table::CalendarEvents, &by_id(id)).await?;
            expect_affected(Table::CalendarEvents, affected, id)
        };
        apply_optimistic(
            &mut self.items,
            |items| items.retain(|item| item.key != key),
            write,
        )
        .await?;
        self.editor = None;
        Ok(())
    }

    /// Mirror a task change made elsewhere on the dashboard.
    pub(crate) fn sync_task(&mut self, task: &Task) {
        let key = ItemKey::task(task.id);
        self.items.retain(|item| item.key != key);
        if let Some(item) = CalendarItem::from_task(task) {
            if is_visible(self.range, &item) {
                self.items.push(item);
                self.items.sort_by(compare_items);
            }
        }
        if let Some(EditSurface::TaskEditor(open)) = self.editor.as_mut() {
            if open.id == task.id {
                open.clone_from(task);
            }
        }
    }

    /// Drop an item deleted elsewhere on the dashboard.
    pub(crate) fn forget(&mut self, key: ItemKey) {
        self.items.retain(|item| item.key != key);
        if let Some(EditSurface::TaskEditor(open)) = self.editor.as_ref() {
            if key == ItemKey::task(open.id) {
                self.editor = None;
            }
        }
    }

    fn require(&self, key: ItemKey) -> Result<&CalendarItem> {
        self.item(key)
            .ok_or_else(|| Error::NotFound(format!("calendar item {key}")))
    }
}

fn overlaps(range: &VisibleRange, event: &CalendarEvent) -> bool {
    event.start_time < range.end && event.end_time.is_none_or(|end| end >= range.start)
}

/// Whether `item` belongs in `range`, by the same rules the fetch uses.
fn is_visible(range: Option<VisibleRange>, item: &CalendarItem) -> bool {
    let Some(range) = range else {
        return true;
    };
    match item.kind() {
        ItemKind::Task => {
            let due = item.start.date_naive();
            due >= range.start_date() && due <= range.end_date()
        }
        ItemKind::Event => item.start < range.end && item.end.is_none_or(|end| end >= range.start),
    }
}
