//! Calendar merging of timed events and dated tasks.
//!
//! Events and tasks live in separate tables with independent id sequences,
//! so every displayed item carries its [`ItemKind`] and is addressed by an
//! [`ItemKey`] of kind plus id. Edits are routed back to the owning table by
//! that kind.

mod board;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::backend::{Backend, CompareOp, Filter, Query, Table};
use crate::models::{CalendarEvent, EventDraft, EventId, Priority, Task, TaskId, UserId};
use crate::{Error, Result};

pub use board::CalendarBoard;

/// Style class added to every task item.
pub const TASK_ITEM_CLASS: &str = "fc-event-task";
/// Style class added to completed task items.
pub const COMPLETED_CLASS: &str = "completed";

/// Half-open visible time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl VisibleRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidInput(
                "Calendar range must end after it starts".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Whole days `first..=last`, from midnight of `first` to midnight after `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        let end = last
            .succ_opt()
            .ok_or_else(|| Error::InvalidInput("Calendar range is out of bounds".to_string()))?;
        Self::new(midnight(first), midnight(end))
    }

    /// The calendar month containing `date`.
    pub fn month(date: NaiveDate) -> Result<Self> {
        let first = date.with_day(1).unwrap_or(date);
        let next = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| Error::InvalidInput("Calendar range is out of bounds".to_string()))?;
        Self::new(midnight(first), midnight(next))
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Calendar date of the range end; task due dates up to and including it
    /// are shown.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

/// Which table a calendar item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Event,
    Task,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
        }
    }

    const fn table(self) -> Table {
        match self {
            Self::Event => Table::CalendarEvents,
            Self::Task => Table::Tasks,
        }
    }
}

/// Identity of a displayed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: i64,
}

impl ItemKey {
    #[must_use]
    pub const fn event(id: EventId) -> Self {
        Self {
            kind: ItemKind::Event,
            id: id.get(),
        }
    }

    #[must_use]
    pub const fn task(id: TaskId) -> Self {
        Self {
            kind: ItemKind::Task,
            id: id.get(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for ItemKey {
    type Err = Error;

    /// Parses the `kind:id` form, e.g. `task:12`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("Invalid calendar item: {s}"));
        let (kind, id) = s.trim().split_once(':').ok_or_else(invalid)?;
        let kind = match kind {
            "event" => ItemKind::Event,
            "task" => ItemKind::Task,
            _ => return Err(invalid()),
        };
        let id = id.parse().map_err(|_| invalid())?;
        Ok(Self { kind, id })
    }
}

/// Source record details kept on an item for edit routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemOrigin {
    Event {
        priority: Option<Priority>,
        category: Option<String>,
    },
    Task(Task),
}

/// Display projection of an event or a dated task. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarItem {
    pub key: ItemKey,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub color: Option<String>,
    pub class_names: Vec<String>,
    pub origin: ItemOrigin,
}

impl CalendarItem {
    #[must_use]
    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            key: ItemKey::event(event.id),
            title: event.title.clone(),
            start: event.start_time,
            end: event.end_time,
            all_day: event.all_day,
            color: event.color.clone(),
            class_names: event
                .priority
                .map(|priority| vec![priority.css_class().to_string()])
                .unwrap_or_default(),
            origin: ItemOrigin::Event {
                priority: event.priority,
                category: event.category.clone(),
            },
        }
    }

    /// Tasks without a due date are not shown.
    #[must_use]
    pub fn from_task(task: &Task) -> Option<Self> {
        let due = task.due_date?;
        let mut class_names = vec![
            TASK_ITEM_CLASS.to_string(),
            task.priority.css_class().to_string(),
        ];
        if task.is_completed {
            class_names.push(COMPLETED_CLASS.to_string());
        }
        Some(Self {
            key: ItemKey::task(task.id),
            title: task.content.clone(),
            start: midnight(due),
            end: None,
            all_day: true,
            color: None,
            class_names,
            origin: ItemOrigin::Task(task.clone()),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.key.kind
    }

    /// Which editor a click on this item opens.
    #[must_use]
    pub fn edit_surface(&self) -> EditSurface {
        match &self.origin {
            ItemOrigin::Task(task) => EditSurface::TaskEditor(task.clone()),
            ItemOrigin::Event { priority, category } => {
                EditSurface::EventEditor(EventDraft::from_event(&CalendarEvent {
                    id: EventId(self.key.id),
                    title: self.title.clone(),
                    start_time: self.start,
                    end_time: self.end,
                    all_day: self.all_day,
                    color: self.color.clone(),
                    priority: *priority,
                    category: category.clone(),
                }))
            }
        }
    }

    /// Reposition locally; tasks keep only the date.
    pub(crate) fn reschedule(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
        match &mut self.origin {
            ItemOrigin::Task(task) => {
                let due = start.date_naive();
                task.due_date = Some(due);
                self.start = midnight(due);
                self.end = None;
            }
            ItemOrigin::Event { .. } => {
                self.start = start;
                self.end = end;
            }
        }
    }
}

/// Editor opened for an item or an empty slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSurface {
    TaskEditor(Task),
    EventEditor(EventDraft),
}

/// Events overlapping the range: start before its end, and end at or after
/// its start or open-ended.
#[must_use]
pub fn event_query(user_id: UserId, range: &VisibleRange) -> Query {
    Query::new()
        .select("id,title,start_time,end_time,all_day,color,priority,category")
        .eq("user_id", user_id)
        .lt("start_time", range.end)
        .or(vec![
            Filter::compare("end_time", CompareOp::Gte, range.start),
            Filter::is_null("end_time"),
        ])
}

/// Tasks with a due date inside the range's dates, inclusive.
#[must_use]
pub fn task_query(user_id: UserId, range: &VisibleRange) -> Query {
    Query::new()
        .select("*")
        .eq("user_id", user_id)
        .not_null("due_date")
        .gte("due_date", range.start_date())
        .lte("due_date", range.end_date())
}

/// Query both tables independently and merge the results.
pub async fn fetch_items<B: Backend>(
    backend: &B,
    user_id: UserId,
    range: &VisibleRange,
) -> Result<Vec<CalendarItem>> {
    let events: Vec<CalendarEvent> = backend
        .fetch(Table::CalendarEvents, &event_query(user_id, range))
        .await?;
    let tasks: Vec<Task> = backend
        .fetch(Table::Tasks, &task_query(user_id, range))
        .await?;
    tracing::debug!(
        "Calendar fetched {} events and {} tasks",
        events.len(),
        tasks.len()
    );
    Ok(merge(&events, &tasks))
}

/// One ordered collection: by start, events before tasks on ties, then id.
#[must_use]
pub fn merge(events: &[CalendarEvent], tasks: &[Task]) -> Vec<CalendarItem> {
    let mut items: Vec<CalendarItem> = events
        .iter()
        .map(CalendarItem::from_event)
        .chain(tasks.iter().filter_map(CalendarItem::from_task))
        .collect();
    items.sort_by(compare_items);
    items
}

fn compare_items(a: &CalendarItem, b: &CalendarItem) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.key.cmp(&b.key))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::models::fixtures;

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    pub(crate) fn event(id: i64, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> CalendarEvent {
        CalendarEvent {
            id: EventId(id),
            title: format!("Event {id}"),
            start_time: start,
            end_time: end,
            all_day: false,
            color: None,
            priority: Some(Priority::High),
            category: None,
        }
    }

    pub(crate) fn dated_task(id: i64, due: NaiveDate) -> Task {
        let mut task = fixtures::task(id, &format!("Task {id}"));
        task.due_date = Some(due);
        task
    }

    #[test]
    fn merge_tags_each_item_with_its_kind() {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let items = merge(
            &[event(1, start, Some(start + chrono::Duration::hours(2)))],
            &[dated_task(1, day(10))],
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, ItemKey::task(TaskId(1)));
        assert_eq!(items[1].key, ItemKey::event(EventId(1)));
        assert_ne!(items[0].key, items[1].key);
    }

    #[test]
    fn class_names_follow_priority_and_completion() {
        let mut task = dated_task(2, day(3));
        task.priority = Priority::Low;
        task.is_completed = true;
        let item = CalendarItem::from_task(&task).unwrap();
        assert_eq!(
            item.class_names,
            vec!["fc-event-task", "priority-low", "completed"]
        );
        assert!(item.all_day);

        let mut untagged = event(3, midnight(day(3)), None);
        untagged.priority = None;
        assert!(CalendarItem::from_event(&untagged).class_names.is_empty());
    }

    #[test]
    fn undated_tasks_are_not_projected() {
        assert!(CalendarItem::from_task(&fixtures::task(1, "someday")).is_none());
    }

    #[test]
    fn click_routes_to_matching_editor() {
        let task_item = CalendarItem::from_task(&dated_task(4, day(4))).unwrap();
        assert!(matches!(task_item.edit_surface(), EditSurface::TaskEditor(task) if task.id == TaskId(4)));

        let event_item = CalendarItem::from_event(&event(4, midnight(day(4)), None));
        match event_item.edit_surface() {
            EditSurface::EventEditor(draft) => {
                assert_eq!(draft.id, Some(EventId(4)));
                assert_eq!(draft.priority, Priority::High);
            }
            other => panic!("unexpected editor: {other:?}"),
        }
    }

    #[test]
    fn item_key_parses_its_display_form() {
        let key = ItemKey::task(TaskId(12));
        assert_eq!(key.to_string().parse::<ItemKey>().unwrap(), key);
        assert!("meeting:1".parse::<ItemKey>().is_err());
        assert!("event:x".parse::<ItemKey>().is_err());
    }

    #[test]
    fn month_range_covers_whole_month() {
        let range = VisibleRange::month(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap()).unwrap();
        assert_eq!(range.start_date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(range.end_date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn event_query_renders_overlap_filters() {
        let range = VisibleRange::days(day(1), day(30)).unwrap();
        let params = event_query(fixtures::user(), &range).to_params();
        assert!(params.contains(&("start_time".to_string(), "lt.2024-07-01T00:00:00Z".to_string())));
        assert!(params.contains(&(
            "or".to_string(),
            "(end_time.gte.2024-06-01T00:00:00Z,end_time.is.null)".to_string()
        )));
    }

    #[tokio::test]
    async fn fetch_items_merges_overlapping_events_and_dated_tasks() {
        let backend = InMemoryBackend::new();
        let user = fixtures::user();
        let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap();

        backend
            .seed(
                Table::CalendarEvents,
                vec![
                    json!({"id": 1, "user_id": user, "title": "Spans N", "start_time": at(9, 20), "end_time": at(10, 2), "all_day": false}),
                    json!({"id": 2, "user_id": user, "title": "Open", "start_time": at(1, 8), "end_time": null, "all_day": true}),
                    json!({"id": 3, "user_id": user, "title": "Ended", "start_time": at(1, 8), "end_time": at(2, 8), "all_day": false}),
                    json!({"id": 4, "user_id": user, "title": "Later", "start_time": at(20, 8), "all_day": false}),
                ],
            )
            .unwrap();
        backend
            .seed(
                Table::Tasks,
                vec![
                    serde_json::to_value(dated_task(1, day(10))).unwrap(),
                    serde_json::to_value(dated_task(2, day(25))).unwrap(),
                    serde_json::to_value(fixtures::task(3, "undated")).unwrap(),
                ],
            )
            .unwrap();

        let range = VisibleRange::days(day(9), day(11)).unwrap();
        let items = fetch_items(&backend, user, &range).await.unwrap();
        let keys: Vec<ItemKey> = items.iter().map(|item| item.key).collect();
        assert_eq!(
            keys,
            vec![
                ItemKey::event(EventId(2)),
                ItemKey::event(EventId(1)),
                ItemKey::task(TaskId(1)),
            ]
        );
    }
}
