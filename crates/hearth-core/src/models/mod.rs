//! Data models for Hearth

mod content;
mod event;
mod ids;
mod location;
mod task;
mod work;

pub use content::{Favorite, GalleryPhoto, PublicNote, TimelineEntry};
pub use event::{CalendarEvent, EventDraft, EventRow, DEFAULT_EVENT_COLOR};
pub use ids::{DocumentId, EventId, PhotoId, ReminderId, TaskId, UserId, WorkNoteId};
pub use location::{GeoPoint, LiveLocation, Profile, PLACEHOLDER_ICON_URL};
pub use task::{NewTask, Priority, Task, TaskColumns, TaskEdit, TaskSort};
pub use work::{Document, FinancialReminder, NewDocument, WorkNote};

#[cfg(test)]
pub(crate) use task::fixtures;
