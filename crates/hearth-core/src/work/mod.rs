//! Private work dashboard: tasks, notes, financial reminders, documents and
//! the calendar.
//!
//! Each list is loaded and mutated independently, so a failure in one area
//! never blocks the others. Mutations patch the local list first and restore
//! it if the backend write fails.

mod documents;
mod records;
mod tasks;

pub use records::note_saved_label;

use chrono::{DateTime, Utc};

use crate::backend::Backend;
use crate::calendar::{CalendarBoard, EditSurface, ItemKey, ItemKind, VisibleRange};
use crate::command::{
    CalendarCommand, Command, DocumentCommand, NoteCommand, ReminderCommand, Tab, TaskCommand,
};
use crate::models::{
    Document, FinancialReminder, Task, TaskEdit, TaskId, TaskSort, UserId, WorkNote,
};
use crate::notice::Notice;
use crate::storage::ObjectStorage;
use crate::Result;

pub struct WorkDashboard<B, S> {
    backend: B,
    storage: S,
    user_id: UserId,
    tab: Tab,
    tasks: Vec<Task>,
    sort: TaskSort,
    editing: Option<TaskId>,
    notes: Vec<WorkNote>,
    reminders: Vec<FinancialReminder>,
    documents: Vec<Document>,
    calendar: Option<CalendarBoard>,
}

impl<B: Backend, S: ObjectStorage> WorkDashboard<B, S> {
    pub const fn new(backend: B, storage: S, user_id: UserId) -> Self {
        Self {
            backend,
            storage,
            user_id,
            tab: Tab::Tasks,
            tasks: Vec::new(),
            sort: TaskSort::Newest,
            editing: None,
            notes: Vec::new(),
            reminders: Vec::new(),
            documents: Vec::new(),
            calendar: None,
        }
    }

    /// Load every list. Failures are reported per area.
    pub async fn load(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        if let Err(error) = self.load_tasks().await {
            notices.push(Notice::from_error("Loading tasks", &error));
        }
        if let Err(error) = self.load_notes().await {
            notices.push(Notice::from_error("Loading notes", &error));
        }
        if let Err(error) = self.load_reminders().await {
            notices.push(Notice::from_error("Loading reminders", &error));
        }
        if let Err(error) = self.load_documents().await {
            notices.push(Notice::from_error("Loading documents", &error));
        }
        notices
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub const fn tab(&self) -> Tab {
        self.tab
    }

    /// Switch tabs. The calendar is set up on first visit, showing the month
    /// of `now`.
    pub async fn switch_tab(&mut self, tab: Tab, now: DateTime<Utc>) -> Result<()> {
        self.tab = tab;
        if tab == Tab::Calendar && self.calendar.is_none() {
            self.show_calendar(VisibleRange::month(now.date_naive())?)
                .await?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn calendar(&self) -> Option<&CalendarBoard> {
        self.calendar.as_ref()
    }

    /// Fetch `range` into the calendar, creating the board once.
    pub async fn show_calendar(&mut self, range: VisibleRange) -> Result<usize> {
        let board = self
            .calendar
            .get_or_insert_with(|| CalendarBoard::new(self.user_id));
        board.refetch(&self.backend, range).await
    }

    /// Run one command, turning any failure into a notice.
    pub async fn dispatch(&mut self, command: Command, now: DateTime<Utc>) -> Option<Notice> {
        let (action, result) = match command {
            Command::Task(command) => self.run_task(command).await,
            Command::Note(command) => self.run_note(command).await,
            Command::Reminder(command) => self.run_reminder(command).await,
            Command::Document(command) => self.run_document(command, now).await,
            Command::Calendar(command) => self.run_calendar(command).await,
            Command::SwitchTab(tab) => ("Opening tab", self.switch_tab(tab, now).await),
        };
        result.err().map(|error| Notice::from_error(action, &error))
    }

    async fn run_task(&mut self, command: TaskCommand) -> (&'static str, Result<()>) {
        match command {
            TaskCommand::Add {
                content,
                priority,
                due_date,
                category,
            } => (
                "Adding task",
                self.add_task(&content, priority, due_date, category)
                    .await
                    .map(drop),
            ),
            TaskCommand::ToggleComplete(id) => ("Updating task", self.toggle_complete(id).await),
            TaskCommand::TogglePin(id) => ("Updating task", self.toggle_pin(id).await),
            TaskCommand::BeginEdit(id) => ("Editing task", self.begin_edit(id)),
            TaskCommand::CancelEdit => {
                self.cancel_edit();
                ("Editing task", Ok(()))
            }
            TaskCommand::SaveEdit(id, edit) => ("Saving task", self.save_edit(id, edit).await),
            TaskCommand::Delete(id) => ("Deleting task", self.delete_task(id).await),
            TaskCommand::Sort(sort) => {
                self.set_sort(sort);
                ("Sorting tasks", Ok(()))
            }
        }
    }

    async fn run_note(&mut self, command: NoteCommand) -> (&'static str, Result<()>) {
        match command {
            NoteCommand::Add { title, content } => {
                ("Saving note", self.add_note(&title, &content).await.map(drop))
            }
            NoteCommand::Delete(id) => ("Deleting note", self.delete_note(id).await),
        }
    }

    async fn run_reminder(&mut self, command: ReminderCommand) -> (&'static str, Result<()>) {
        match command {
            ReminderCommand::Add { content, due_date } => (
                "Adding reminder",
                self.add_reminder(&content, due_date).await.map(drop),
            ),
            ReminderCommand::TogglePaid(id) => {
                ("Updating reminder", self.toggle_paid(id).await)
            }
            ReminderCommand::Delete(id) => ("Deleting reminder", self.delete_reminder(id).await),
        }
    }

    async fn run_document(
        &mut self,
        command: DocumentCommand,
        now: DateTime<Utc>,
    ) -> (&'static str, Result<()>) {
        match command {
            DocumentCommand::Upload { name, file } => (
                "Document upload",
                self.upload_document(&name, file.as_ref(), now)
                    .await
                    .map(drop),
            ),
            DocumentCommand::Delete(id) => ("Deleting document", self.delete_document(id).await),
        }
    }

    async fn run_calendar(&mut self, command: CalendarCommand) -> (&'static str, Result<()>) {
        match command {
            CalendarCommand::ShowRange(range) => {
                ("Loading calendar", self.show_calendar(range).await.map(drop))
            }
            CalendarCommand::ClickDate(date) => {
                self.board().open_date(date);
                ("Opening event", Ok(()))
            }
            CalendarCommand::Select {
                start,
                end,
                all_day,
            } => {
                self.board().open_selection(start, end, all_day);
                ("Opening event", Ok(()))
            }
            CalendarCommand::ClickItem(key) => {
                ("Opening item", self.board().click(key).map(drop))
            }
            CalendarCommand::Move { key, start, end } => {
                ("Rescheduling item", self.move_calendar_item(key, start, end).await)
            }
            CalendarCommand::Resize { key, end } => {
                let board = self
                    .calendar
                    .get_or_insert_with(|| CalendarBoard::new(self.user_id));
                ("Resizing event", board.resize_event(&self.backend, key, end).await)
            }
            CalendarCommand::SaveEvent(draft) => {
                let board = self
                    .calendar
                    .get_or_insert_with(|| CalendarBoard::new(self.user_id));
                ("Saving event", board.save_event(&self.backend, &draft).await)
            }
            CalendarCommand::DeleteEvent(id) => {
                let board = self
                    .calendar
                    .get_or_insert_with(|| CalendarBoard::new(self.user_id));
                ("Deleting event", board.delete_event(&self.backend, id).await)
            }
            CalendarCommand::CloseEditor => {
                self.board().close_editor();
                ("Closing editor", Ok(()))
            }
            CalendarCommand::ToggleTaskComplete(id) => (
                "Updating task status",
                self.modal_task_action(id, ModalAction::ToggleComplete).await,
            ),
            CalendarCommand::SaveTask(id, edit) => (
                "Saving task",
                self.modal_task_action(id, ModalAction::Save(edit)).await,
            ),
            CalendarCommand::DeleteTask(id) => (
                "Deleting task",
                self.modal_task_action(id, ModalAction::Delete).await,
            ),
        }
    }

    fn board(&mut self) -> &mut CalendarBoard {
        self.calendar
            .get_or_insert_with(|| CalendarBoard::new(self.user_id))
    }

    /// Drag on the calendar; a moved task also moves in the task list.
    pub async fn move_calendar_item(
        &mut self,
        key: ItemKey,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let board = self
            .calendar
            .get_or_insert_with(|| CalendarBoard::new(self.user_id));
        board.move_item(&self.backend, key, start, end).await?;

        if key.kind == ItemKind::Task {
            let due = start.date_naive();
            if let Some(task) = self.tasks.iter_mut().find(|task| task.id.get() == key.id) {
                task.due_date = Some(due);
            }
        }
        Ok(())
    }

    /// Task modal opened from the calendar. Closes the modal on success.
    async fn modal_task_action(&mut self, id: TaskId, action: ModalAction) -> Result<()> {
        if self.task(id).is_err() {
            self.load_tasks().await?;
        }
        match action {
            ModalAction::ToggleComplete => self.toggle_complete(id).await?,
            ModalAction::Save(edit) => self.save_edit(id, edit).await?,
            ModalAction::Delete => self.delete_task(id).await?,
        }
        if let Some(board) = self.calendar.as_mut() {
            if matches!(board.editor(), Some(EditSurface::TaskEditor(task)) if task.id == id) {
                board.close_editor();
            }
        }
        Ok(())
    }

    /// Mirror the local copy of a task into the calendar.
    fn sync_calendar_task(&mut self, id: TaskId) {
        let Some(board) = self.calendar.as_mut() else {
            return;
        };
        match self.tasks.iter().find(|task| task.id == id) {
            Some(task) => board.sync_task(task),
            None => board.forget(ItemKey::task(id)),
        }
    }
}

enum ModalAction {
    ToggleComplete,
    Save(TaskEdit),
    Delete,
}
