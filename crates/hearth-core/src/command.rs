//! Dashboard commands.
//!
//! Every user interaction on the work dashboard becomes a [`Command`] before
//! anything is done with it. Clicks on list cards arrive as an
//! [`Interaction`] naming the card scope, the control that was pressed and
//! the record it belongs to; [`Interaction::parse`] turns that into a command
//! or rejects it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{ItemKey, VisibleRange};
use crate::models::{
    DocumentId, EventDraft, EventId, Priority, ReminderId, TaskEdit, TaskId, TaskSort, WorkNoteId,
};
use crate::storage::Upload;
use crate::util::normalize_text_option;
use crate::{Error, Result};

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Tasks,
    Notes,
    Reminders,
    Documents,
    Calendar,
}

impl Tab {
    pub const ALL: [Self; 5] = [
        Self::Tasks,
        Self::Notes,
        Self::Reminders,
        Self::Documents,
        Self::Calendar,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::Reminders => "reminders",
            Self::Documents => "documents",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = Error;

    /// Accepts `tasks` as well as the panel id form `tab-tasks`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let name = name.strip_prefix("tab-").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str() == name)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown tab: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Add {
        content: String,
        priority: Priority,
        due_date: Option<NaiveDate>,
        category: Option<String>,
    },
    ToggleComplete(TaskId),
    TogglePin(TaskId),
    BeginEdit(TaskId),
    CancelEdit,
    SaveEdit(TaskId, TaskEdit),
    Delete(TaskId),
    Sort(TaskSort),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteCommand {
    Add { title: String, content: String },
    Delete(WorkNoteId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderCommand {
    Add {
        content: String,
        due_date: Option<NaiveDate>,
    },
    TogglePaid(ReminderId),
    Delete(ReminderId),
}

#[derive(Debug, Clone)]
pub enum DocumentCommand {
    Upload { name: String, file: Option<Upload> },
    Delete(DocumentId),
}

/// Calendar gestures and the two editor modals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCommand {
    ShowRange(VisibleRange),
    ClickDate(NaiveDate),
    Select {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
    },
    ClickItem(ItemKey),
    Move {
        key: ItemKey,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
    Resize {
        key: ItemKey,
        end: DateTime<Utc>,
    },
    SaveEvent(EventDraft),
    DeleteEvent(EventId),
    CloseEditor,
    ToggleTaskComplete(TaskId),
    SaveTask(TaskId, TaskEdit),
    DeleteTask(TaskId),
}

#[derive(Debug, Clone)]
pub enum Command {
    Task(TaskCommand),
    Note(NoteCommand),
    Reminder(ReminderCommand),
    Document(DocumentCommand),
    Calendar(CalendarCommand),
    SwitchTab(Tab),
}

/// Which list a clicked control lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Task,
    Note,
    Reminder,
    Document,
    Tab,
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "task" | "task-card" => Ok(Self::Task),
            "note" | "work-note-card" => Ok(Self::Note),
            "reminder" | "reminder-card" => Ok(Self::Reminder),
            "document" | "document-card" => Ok(Self::Document),
            "tab" | "dashboard-nav" => Ok(Self::Tab),
            other => Err(Error::InvalidInput(format!("Unknown scope: {other}"))),
        }
    }
}

/// A raw click: scope, control name and the record it targets.
///
/// Inline task edits also carry the editor's field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub scope: Scope,
    pub control: String,
    pub record: String,
    pub fields: BTreeMap<String, String>,
}

impl Interaction {
    pub fn new(scope: Scope, control: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            scope,
            control: control.into(),
            record: record.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Resolve the click into a command.
    pub fn parse(&self) -> Result<Command> {
        let control = self.control.trim();
        match self.scope {
            Scope::Task => {
                let id = || self.record_id().map(TaskId);
                let command = match control {
                    "complete-button" => TaskCommand::ToggleComplete(id()?),
                    "pin-button" => TaskCommand::TogglePin(id()?),
                    "edit-button" => TaskCommand::BeginEdit(id()?),
                    "cancel-edit-button" => TaskCommand::CancelEdit,
                    "save-edit-button" => TaskCommand::SaveEdit(id()?, self.task_edit()?),
                    "delete-button" => TaskCommand::Delete(id()?),
                    _ => return Err(self.unknown_control()),
                };
                Ok(Command::Task(command))
            }
            Scope::Note => match control {
                "delete-button" => Ok(Command::Note(NoteCommand::Delete(WorkNoteId(
                    self.record_id()?,
                )))),
                _ => Err(self.unknown_control()),
            },
            Scope::Reminder => {
                let id = ReminderId(self.record_id()?);
                match control {
                    "mark-paid-button" => Ok(Command::Reminder(ReminderCommand::TogglePaid(id))),
                    "delete-button" => Ok(Command::Reminder(ReminderCommand::Delete(id))),
                    _ => Err(self.unknown_control()),
                }
            }
            Scope::Document => match control {
                "delete-button" => Ok(Command::Document(DocumentCommand::Delete(DocumentId(
                    self.record_id()?,
                )))),
                _ => Err(self.unknown_control()),
            },
            Scope::Tab => match control {
                "dashboard-tab-button" => Ok(Command::SwitchTab(self.record.parse()?)),
                _ => Err(self.unknown_control()),
            },
        }
    }

    fn record_id(&self) -> Result<i64> {
        self.record
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid record id: {:?}", self.record)))
    }

    fn field(&self, name: &str) -> Option<String> {
        normalize_text_option(self.fields.get(name).cloned())
    }

    fn task_edit(&self) -> Result<TaskEdit> {
        let priority = self
            .field("priority")
            .map_or(Ok(Priority::default()), |raw| raw.parse())?;
        let due_date = self
            .field("due_date")
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| Error::InvalidInput(format!("Invalid due date: {raw}")))
            })
            .transpose()?;
        TaskEdit {
            content: self.field("content").unwrap_or_default(),
            priority,
            due_date,
        }
        .validated()
    }

    fn unknown_control(&self) -> Error {
        Error::InvalidInput(format!(
            "Unknown control {:?} for {:?}",
            self.control, self.scope
        ))
    }
}
