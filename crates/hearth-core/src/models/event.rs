//! Calendar event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, UserId};
use super::task::Priority;
use crate::error::{Error, Result};

/// Color applied to events that never picked one.
pub const DEFAULT_EVENT_COLOR: &str = "#f4acb7";

/// A timed or all-day calendar entry owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub color: Option<String>,
    /// Stored at creation time; rows written before priorities existed may lack it.
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Contents of the event editor, for both new and existing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub id: Option<EventId>,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub color: String,
    pub priority: Priority,
    pub category: Option<String>,
}

impl EventDraft {
    /// Blank draft for a clicked date or a selected span.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>, all_day: bool) -> Self {
        Self {
            id: None,
            title: String::new(),
            start,
            end,
            all_day,
            color: DEFAULT_EVENT_COLOR.to_string(),
            priority: Priority::Medium,
            category: None,
        }
    }

    /// Draft pre-filled from an existing event.
    #[must_use]
    pub fn from_event(event: &CalendarEvent) -> Self {
        Self {
            id: Some(event.id),
            title: event.title.clone(),
            start: event.start_time,
            end: event.end_time,
            all_day: event.all_day,
            color: event
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_EVENT_COLOR.to_string()),
            priority: event.priority.unwrap_or_default(),
            category: event.category.clone(),
        }
    }

    /// Build the row payload written on save.
    ///
    /// All-day events drop their end time.
    pub fn to_row(&self, user_id: UserId) -> Result<EventRow> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Event title cannot be empty.".to_string()));
        }
        let end_time = if self.all_day { None } else { self.end };
        if let Some(end) = end_time {
            if end < self.start {
                return Err(Error::InvalidInput(
                    "Event end cannot be before its start.".to_string(),
                ));
            }
        }

        Ok(EventRow {
            user_id,
            title: title.to_string(),
            start_time: self.start,
            end_time,
            all_day: self.all_day,
            color: self.color.clone(),
            priority: self.priority,
            category: self.category.clone(),
        })
    }
}

/// Insert/update payload for `calendar_events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub user_id: UserId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub color: String,
    pub priority: Priority,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::task::fixtures::user;

    #[test]
    fn new_draft_defaults_to_medium_priority() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let draft = EventDraft::new(start, None, true);
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.color, DEFAULT_EVENT_COLOR);
    }

    #[test]
    fn all_day_row_drops_end_time() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut draft = EventDraft::new(start, Some(start + chrono::Duration::hours(2)), true);
        draft.title = "Picnic".to_string();
        let row = draft.to_row(user()).unwrap();
        assert_eq!(row.end_time, None);
        assert_eq!(row.priority, Priority::Medium);
    }

    #[test]
    fn row_requires_title_and_ordered_times() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut draft = EventDraft::new(start, Some(start - chrono::Duration::hours(1)), false);
        assert!(draft.to_row(user()).is_err());
        draft.title = "Dentist".to_string();
        assert!(draft.to_row(user()).is_err());
    }

    #[test]
    fn event_without_priority_keeps_none_on_display() {
        let row = serde_json::json!({
            "id": 1,
            "title": "Old event",
            "start_time": "2024-06-01T09:00:00+00:00",
            "end_time": null,
            "all_day": false,
            "color": null
        });
        let event: CalendarEvent = serde_json::from_value(row).unwrap();
        assert_eq!(event.priority, None);
        assert_eq!(EventDraft::from_event(&event).priority, Priority::Medium);
    }
}
