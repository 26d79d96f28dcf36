use chrono::NaiveDate;
use serde_json::{json, Value};

use super::WorkDashboard;
use crate::backend::{by_id, expect_affected, Backend, Query, Table};
use crate::models::{NewTask, Priority, Task, TaskColumns, TaskEdit, TaskId, TaskSort};
use crate::optimistic::apply_optimistic;
use crate::storage::ObjectStorage;
use crate::util::normalize_text_option;
use crate::{Error, Result};

impl<B: Backend, S: ObjectStorage> WorkDashboard<B, S> {
    pub async fn load_tasks(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("*")
            .eq("user_id", self.user_id)
            .order("created_at", false);
        self.tasks = self.backend.fetch(Table::Tasks, &query).await?;
        tracing::debug!("Loaded {} tasks", self.tasks.len());
        Ok(self.tasks.len())
    }

    /// Tasks newest first.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }

    /// Pinned, pending and completed columns under the current sort.
    #[must_use]
    pub fn columns(&self) -> TaskColumns {
        TaskColumns::partition(&self.tasks, self.sort)
    }

    #[must_use]
    pub const fn sort(&self) -> TaskSort {
        self.sort
    }

    pub fn set_sort(&mut self, sort: TaskSort) {
        self.sort = sort;
    }

    pub async fn add_task(
        &mut self,
        content: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
        category: Option<String>,
    ) -> Result<TaskId> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidInput(
                "Task content cannot be empty.".to_string(),
            ));
        }
        let row = NewTask {
            user_id: self.user_id,
            content: content.to_string(),
            priority,
            due_date,
            category: normalize_text_option(category),
        };

        let task: Task = self.backend.insert_record(Table::Tasks, &row).await?;
        let id = task.id;
        tracing::debug!("Added task {id}");
        self.tasks.insert(0, task);
        self.sync_calendar_task(id);
        Ok(id)
    }

    pub async fn toggle_complete(&mut self, id: TaskId) -> Result<()> {
        let done = !self.task(id)?.is_completed;
        self.patch_task(id, json!({ "is_completed": done }), |task| {
            task.is_completed = done;
        })
        .await
    }

    pub async fn toggle_pin(&mut self, id: TaskId) -> Result<()> {
        let pinned = !self.task(id)?.is_pinned;
        self.patch_task(id, json!({ "is_pinned": pinned }), |task| {
            task.is_pinned = pinned;
        })
        .await
    }

    /// Open the inline editor for one task; any other open editor closes.
    pub fn begin_edit(&mut self, id: TaskId) -> Result<()> {
        self.task(id)?;
        self.editing = Some(id);
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    #[must_use]
    pub const fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    /// Save an inline or modal edit. The editor stays open if the save fails.
    pub async fn save_edit(&mut self, id: TaskId, edit: TaskEdit) -> Result<()> {
        let edit = edit.validated()?;
        self.task(id)?;
        let patch = serde_json::to_value(&edit)?;
        self.patch_task(id, patch, |task| edit.apply_to(task)).await?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        Ok(())
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        self.task(id)?;
        let backend = &self.backend;
        let write = async move {
            let affected = backend.delete(Table::Tasks, &by_id(id)).await?;
            expect_affected(Table::Tasks, affected, id)
        };
        apply_optimistic(
            &mut self.tasks,
            |tasks| tasks.retain(|task| task.id != id),
            write,
        )
        .await?;

        if self.editing == Some(id) {
            self.editing = None;
        }
        self.sync_calendar_task(id);
        Ok(())
    }

    async fn patch_task(
        &mut self,
        id: TaskId,
        patch: Value,
        mutate: impl FnOnce(&mut Task),
    ) -> Result<()> {
        let backend = &self.backend;
        let write = async move {
            let affected = backend.update(Table::Tasks, &by_id(id), patch).await?;
            expect_affected(Table::Tasks, affected, id)
        };
        apply_optimistic(
            &mut self.tasks,
            |tasks| {
                if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
                    mutate(task);
                }
            },
            write,
        )
        .await?;
        self.sync_calendar_task(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::work::tests::dashboard;

    fn date(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 6, d)
    }

    #[tokio::test]
    async fn added_tasks_are_listed_newest_first() {
        let (mut dashboard, backend, _) = dashboard();
        dashboard
            .add_task("Water plants", Priority::Low, None, None)
            .await
            .unwrap();
        dashboard
            .add_task("  Pay rent ", Priority::High, date(1), Some(" home ".to_string()))
            .await
            .unwrap();

        assert_eq!(dashboard.tasks()[0].content, "Pay rent");
        assert_eq!(dashboard.tasks()[0].category.as_deref(), Some("home"));

        dashboard.load_tasks().await.unwrap();
        assert_eq!(dashboard.tasks().len(), 2);
        assert_eq!(backend.rows(Table::Tasks).unwrap()[1]["task_content"], "Pay rent");
    }

    #[tokio::test]
    async fn empty_task_is_rejected_before_any_write() {
        let (mut dashboard, backend, _) = dashboard();
        let error = dashboard
            .add_task("   ", Priority::Medium, None, None)
            .await
            .unwrap_err();
        assert!(error.is_validation());
        assert!(backend.rows(Table::Tasks).unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggles_move_tasks_between_columns() {
        let (mut dashboard, backend, _) = dashboard();
        let pinned = dashboard
            .add_task("Pinned", Priority::Medium, None, None)
            .await
            .unwrap();
        let done = dashboard
            .add_task("Done", Priority::Medium, None, None)
            .await
            .unwrap();

        dashboard.toggle_pin(pinned).await.unwrap();
        dashboard.toggle_complete(done).await.unwrap();

        let columns = dashboard.columns();
        assert_eq!(columns.pinned.len(), 1);
        assert_eq!(columns.completed.len(), 1);
        assert!(columns.pending.is_empty());

        let rows = backend.rows(Table::Tasks).unwrap();
        assert_eq!(rows[0]["is_pinned"], true);
        assert_eq!(rows[1]["is_completed"], true);
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back() {
        let (mut dashboard, backend, _) = dashboard();
        let id = dashboard
            .add_task("Call mum", Priority::Medium, None, None)
            .await
            .unwrap();
        backend.fail_writes(Table::Tasks, true).unwrap();

        assert!(dashboard.toggle_complete(id).await.is_err());
        assert!(!dashboard.task(id).unwrap().is_completed);
    }

    #[tokio::test]
    async fn inline_edit_saves_and_closes_editor() {
        let (mut dashboard, backend, _) = dashboard();
        let id = dashboard
            .add_task("Draft", Priority::Low, None, None)
            .await
            .unwrap();

        dashboard.begin_edit(id).unwrap();
        assert_eq!(dashboard.editing(), Some(id));

        let edit = TaskEdit {
            content: " Final ".to_string(),
            priority: Priority::High,
            due_date: date(30),
        };
        dashboard.save_edit(id, edit).await.unwrap();

        assert_eq!(dashboard.editing(), None);
        let task = dashboard.task(id).unwrap();
        assert_eq!(task.content, "Final");
        assert_eq!(task.priority, Priority::High);
        let row = &backend.rows(Table::Tasks).unwrap()[0];
        assert_eq!(row["task_content"], "Final");
        assert_eq!(row["due_date"], "2024-06-30");
    }

    #[tokio::test]
    async fn failed_edit_keeps_editor_open_and_restores_task() {
        let (mut dashboard, backend, _) = dashboard();
        let id = dashboard
            .add_task("Original", Priority::Low, None, None)
            .await
            .unwrap();
        dashboard.begin_edit(id).unwrap();
        backend.fail_writes(Table::Tasks, true).unwrap();

        let edit = TaskEdit {
            content: "Changed".to_string(),
            priority: Priority::High,
            due_date: None,
        };
        assert!(dashboard.save_edit(id, edit).await.is_err());
        assert_eq!(dashboard.editing(), Some(id));
        assert_eq!(dashboard.task(id).unwrap().content, "Original");
    }

    #[tokio::test]
    async fn delete_removes_locally_and_remotely() {
        let (mut dashboard, backend, _) = dashboard();
        let id = dashboard
            .add_task("Temporary", Priority::Low, None, None)
            .await
            .unwrap();

        dashboard.delete_task(id).await.unwrap();
        assert!(dashboard.tasks().is_empty());
        assert!(backend.rows(Table::Tasks).unwrap().is_empty());
        assert!(dashboard.delete_task(id).await.is_err());
    }

    #[tokio::test]
    async fn sort_applies_to_pending_column() {
        let (mut dashboard, _, _) = dashboard();
        dashboard
            .add_task("later", Priority::Low, date(20), None)
            .await
            .unwrap();
        dashboard
            .add_task("sooner", Priority::High, date(2), None)
            .await
            .unwrap();
        dashboard
            .add_task("whenever", Priority::Medium, None, None)
            .await
            .unwrap();

        dashboard.set_sort(TaskSort::DueDate);
        let names: Vec<String> = dashboard
            .columns()
            .pending
            .into_iter()
            .map(|task| task.content)
            .collect();
        assert_eq!(names, vec!["sooner", "later", "whenever"]);
    }
}
