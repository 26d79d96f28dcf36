use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use super::WorkDashboard;
use crate::backend::{by_id, expect_affected, Backend, Query, Table};
use crate::format::format_time_ago;
use crate::models::{FinancialReminder, ReminderId, WorkNote, WorkNoteId};
use crate::optimistic::apply_optimistic;
use crate::storage::ObjectStorage;
use crate::{Error, Result};

/// "Saved 3 hours ago"
#[must_use]
pub fn note_saved_label(note: &WorkNote, now: DateTime<Utc>) -> String {
    format!("Saved {}", format_time_ago(note.created_at, now))
}

impl<B: Backend, S: ObjectStorage> WorkDashboard<B, S> {
    pub async fn load_notes(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("*")
            .eq("user_id", self.user_id)
            .order("created_at", false);
        self.notes = self.backend.fetch(Table::WorkNotes, &query).await?;
        Ok(self.notes.len())
    }

    #[must_use]
    pub fn notes(&self) -> &[WorkNote] {
        &self.notes
    }

    pub async fn add_note(&mut self, title: &str, content: &str) -> Result<WorkNoteId> {
        let (title, content) = (title.trim(), content.trim());
        if title.is_empty() || content.is_empty() {
            return Err(Error::InvalidInput(
                "Please provide a title and content for the note.".to_string(),
            ));
        }
        let row = json!({ "user_id": self.user_id, "title": title, "content": content });
        let note: WorkNote = self.backend.insert_record(Table::WorkNotes, &row).await?;
        let id = note.id;
        self.notes.insert(0, note);
        Ok(id)
    }

    pub async fn delete_note(&mut self, id: WorkNoteId) -> Result<()> {
        if !self.notes.iter().any(|note| note.id == id) {
            return Err(Error::NotFound(format!("note {id}")));
        }
        let backend = &self.backend;
        let write = async move {
            let affected = backend.delete(Table::WorkNotes, &by_id(id)).await?;
            expect_affected(Table::WorkNotes, affected, id)
        };
        apply_optimistic(
            &mut self.notes,
            |notes| notes.retain(|note| note.id != id),
            write,
        )
        .await
    }

    pub async fn load_reminders(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("*")
            .eq("user_id", self.user_id)
            .order("due_date", true);
        self.reminders = self
            .backend
            .fetch(Table::FinancialReminders, &query)
            .await?;
        Ok(self.reminders.len())
    }

    /// Reminders by due date, soonest first.
    #[must_use]
    pub fn reminders(&self) -> &[FinancialReminder] {
        &self.reminders
    }

    pub async fn add_reminder(
        &mut self,
        content: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<ReminderId> {
        let content = content.trim();
        let (false, Some(due_date)) = (content.is_empty(), due_date) else {
            return Err(Error::InvalidInput(
                "Please provide content and a due date for the reminder.".to_string(),
            ));
        };
        let row = json!({
            "user_id": self.user_id,
            "reminder_content": content,
            "due_date": due_date,
        });
        let reminder: FinancialReminder = self
            .backend
            .insert_record(Table::FinancialReminders, &row)
            .await?;
        let id = reminder.id;
        let at = self
            .reminders
            .partition_point(|existing| existing.due_date <= reminder.due_date);
        self.reminders.insert(at, reminder);
        Ok(id)
    }

    pub async fn toggle_paid(&mut self, id: ReminderId) -> Result<()> {
        let paid = !self
            .reminders
            .iter()
            .find(|reminder| reminder.id == id)
            .ok_or_else(|| Error::NotFound(format!("reminder {id}")))?
            .is_paid;

        let backend = &self.backend;
        let write = async move {
            let affected = backend
                .update(
                    Table::FinancialReminders,
                    &by_id(id),
                    json!({ "is_paid": paid }),
                )
                .await?;
            expect_affected(Table::FinancialReminders, affected, id)
        };
        apply_optimistic(
            &mut self.reminders,
            |reminders| {
                if let Some(reminder) = reminders.iter_mut().find(|reminder| reminder.id == id) {
                    reminder.is_paid = paid;
                }
            },
            write,
        )
        .await
    }

    pub async fn delete_reminder(&mut self, id: ReminderId) -> Result<()> {
        if !self.reminders.iter().any(|reminder| reminder.id == id) {
            return Err(Error::NotFound(format!("reminder {id}")));
        }
        let backend = &self.backend;
        let write = async move {
            let affected = backend
                .delete(Table::FinancialReminders, &by_id(id))
                .await?;
            expect_affected(Table::FinancialReminders, affected, id)
        };
        apply_optimistic(
            &mut self.reminders,
            |reminders| reminders.retain(|reminder| reminder.id != id),
            write,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::work::tests::dashboard;

    #[tokio::test]
    async fn notes_need_title_and_content() {
        let (mut dashboard, backend, _) = dashboard();
        assert!(dashboard
            .add_note("Standup", "  ")
            .await
            .unwrap_err()
            .is_validation());
        assert!(backend.rows(Table::WorkNotes).unwrap().is_empty());

        let id = dashboard.add_note(" Standup ", "Demo on Friday").await.unwrap();
        assert_eq!(dashboard.notes()[0].title, "Standup");

        dashboard.delete_note(id).await.unwrap();
        assert!(dashboard.notes().is_empty());
        assert!(backend.rows(Table::WorkNotes).unwrap().is_empty());
    }

    #[test]
    fn saved_label_uses_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let note = WorkNote {
            id: WorkNoteId(1),
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: now - chrono::Duration::hours(3),
        };
        assert_eq!(note_saved_label(&note, now), "Saved 3 hours ago");
    }

    #[tokio::test]
    async fn reminders_stay_in_due_date_order() {
        let (mut dashboard, _, _) = dashboard();
        for (content, day) in [("Rent", 28), ("Phone", 5), ("Gym", 15)] {
            dashboard
                .add_reminder(content, NaiveDate::from_ymd_opt(2024, 6, day))
                .await
                .unwrap();
        }
        let order: Vec<&str> = dashboard
            .reminders()
            .iter()
            .map(|reminder| reminder.content.as_str())
            .collect();
        assert_eq!(order, vec!["Phone", "Gym", "Rent"]);

        dashboard.load_reminders().await.unwrap();
        assert_eq!(dashboard.reminders()[0].content, "Phone");
    }

    #[tokio::test]
    async fn reminder_requires_due_date() {
        let (mut dashboard, _, _) = dashboard();
        let error = dashboard.add_reminder("Insurance", None).await.unwrap_err();
        assert!(error.is_validation());
    }

    #[tokio::test]
    async fn paid_toggle_rolls_back_on_failure() {
        let (mut dashboard, backend, _) = dashboard();
        let id = dashboard
            .add_reminder("Water bill", NaiveDate::from_ymd_opt(2024, 6, 3))
            .await
            .unwrap();

        dashboard.toggle_paid(id).await.unwrap();
        assert!(dashboard.reminders()[0].is_paid);

        backend.fail_writes(Table::FinancialReminders, true).unwrap();
        assert!(dashboard.toggle_paid(id).await.is_err());
        assert!(dashboard.reminders()[0].is_paid);
        assert!(dashboard.delete_reminder(id).await.is_err());
        assert_eq!(dashboard.reminders().len(), 1);
    }
}
