//! Task model and list ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskId, UserId};
use crate::error::{Error, Result};

/// Priority shared by tasks and calendar events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Style class, e.g. `priority-high`.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Low => "priority-low",
            Self::Medium => "priority-medium",
            Self::High => "priority-high",
        }
    }

    /// Sort rank, most urgent first.
    const fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::InvalidInput(format!("Unknown priority: {other}"))),
        }
    }
}

/// A work task owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    #[serde(rename = "task_content")]
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub user_id: UserId,
    #[serde(rename = "task_content")]
    pub content: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: Option<String>,
}

/// Fields edited from the inline editor or the task modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdit {
    #[serde(rename = "task_content")]
    pub content: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskEdit {
    /// Trim content and reject an empty edit.
    pub fn validated(mut self) -> Result<Self> {
        self.content = self.content.trim().to_string();
        if self.content.is_empty() {
            return Err(Error::InvalidInput(
                "Task content cannot be empty.".to_string(),
            ));
        }
        Ok(self)
    }

    /// Apply this edit to a local copy of the task.
    pub fn apply_to(&self, task: &mut Task) {
        task.content.clone_from(&self.content);
        task.priority = self.priority;
        task.due_date = self.due_date;
    }
}

/// Ordering for the pending column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    #[default]
    Newest,
    Priority,
    DueDate,
}

impl FromStr for TaskSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "newest" | "created_at" => Ok(Self::Newest),
            "priority" => Ok(Self::Priority),
            "due_date" | "due" => Ok(Self::DueDate),
            other => Err(Error::InvalidInput(format!("Unknown task sort: {other}"))),
        }
    }
}

/// Tasks split into the three dashboard columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskColumns {
    pub pinned: Vec<Task>,
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskColumns {
    /// Partition tasks: pinned and open, open, completed. Pending is sorted.
    #[must_use]
    pub fn partition(tasks: &[Task], sort: TaskSort) -> Self {
        let mut columns = Self::default();
        for task in tasks {
            if task.is_completed {
                columns.completed.push(task.clone());
            } else if task.is_pinned {
                columns.pinned.push(task.clone());
            } else {
                columns.pending.push(task.clone());
            }
        }
        columns.pending.sort_by(|a, b| compare_tasks(a, b, sort));
        columns
    }
}

fn compare_tasks(a: &Task, b: &Task, sort: TaskSort) -> Ordering {
    match sort {
        TaskSort::Priority => a.priority.rank().cmp(&b.priority.rank()),
        // Undated tasks go last.
        TaskSort::DueDate => match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        TaskSort::Newest => b.created_at.cmp(&a.created_at),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    pub fn user() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0190_b5a4_5a4e_7c1e_9f39_6d0b_3f1c_2a11))
    }

    pub fn task(id: i64, content: &str) -> Task {
        Task {
            id: TaskId(id),
            user_id: user(),
            content: content.to_string(),
            priority: Priority::Medium,
            due_date: None,
            is_completed: false,
            is_pinned: false,
            category: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::fixtures::task;
    use super::*;

    #[test]
    fn parses_backend_row_with_task_content_column() {
        let row = serde_json::json!({
            "id": 3,
            "user_id": "0190b5a4-5a4e-7c1e-9f39-6d0b3f1c2a11",
            "task_content": "File taxes",
            "priority": "High",
            "due_date": "2024-04-15",
            "is_completed": false,
            "is_pinned": true,
            "category": null,
            "created_at": "2024-01-01T00:00:00+00:00"
        });
        let task: Task = serde_json::from_value(row).unwrap();
        assert_eq!(task.content, "File taxes");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 4, 15));
    }

    #[test]
    fn priority_classes_and_parsing() {
        assert_eq!(Priority::High.css_class(), "priority-high");
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn partition_splits_columns() {
        let mut pinned = task(1, "pinned");
        pinned.is_pinned = true;
        let mut done = task(2, "done");
        done.is_completed = true;
        done.is_pinned = true;
        let open = task(3, "open");

        let columns = TaskColumns::partition(&[pinned, done, open], TaskSort::Newest);
        assert_eq!(columns.pinned.len(), 1);
        assert_eq!(columns.completed.len(), 1);
        assert_eq!(columns.pending[0].content, "open");
    }

    #[test]
    fn pending_sorts_by_priority_then_due_date() {
        let mut low = task(1, "low");
        low.priority = Priority::Low;
        low.due_date = NaiveDate::from_ymd_opt(2024, 1, 2);
        let mut high = task(2, "high");
        high.priority = Priority::High;
        let mut medium = task(3, "medium");
        medium.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let tasks = vec![low, high, medium];

        let by_priority = TaskColumns::partition(&tasks, TaskSort::Priority);
        let names: Vec<_> = by_priority.pending.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(names, vec!["high", "medium", "low"]);

        let by_due = TaskColumns::partition(&tasks, TaskSort::DueDate);
        let names: Vec<_> = by_due.pending.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(names, vec!["medium", "low", "high"]);

        let newest = TaskColumns::partition(&tasks, TaskSort::Newest);
        assert_eq!(newest.pending[0].content, "medium");
    }

    #[test]
    fn edit_validation_trims_and_rejects_empty() {
        let edit = TaskEdit {
            content: "  call bank ".to_string(),
            priority: Priority::Low,
            due_date: None,
        };
        assert_eq!(edit.validated().unwrap().content, "call bank");

        let empty = TaskEdit {
            content: "   ".to_string(),
            priority: Priority::Low,
            due_date: None,
        };
        assert!(empty.validated().unwrap_err().is_validation());
    }
}
