//! Work dashboard records: notes, financial reminders, documents

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, ReminderId, UserId, WorkNoteId};

/// A private work note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkNote {
    pub id: WorkNoteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A bill or payment to remember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialReminder {
    pub id: ReminderId,
    #[serde(rename = "reminder_content", alias = "content")]
    pub content: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_paid: bool,
}

/// An uploaded document and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(rename = "document_name", alias = "name")]
    pub name: String,
    pub file_url: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDocument {
    pub user_id: UserId,
    #[serde(rename = "document_name")]
    pub name: String,
    pub file_url: String,
    pub file_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_accepts_legacy_content_column() {
        let reminder: FinancialReminder = serde_json::from_value(serde_json::json!({
            "id": 1,
            "content": "Rent",
            "due_date": "2024-07-01"
        }))
        .unwrap();
        assert_eq!(reminder.content, "Rent");
        assert!(!reminder.is_paid);
    }

    #[test]
    fn document_serializes_document_name_column() {
        let row = NewDocument {
            user_id: "0190b5a4-5a4e-7c1e-9f39-6d0b3f1c2a11".parse().unwrap(),
            name: "Lease".to_string(),
            file_url: "https://cdn.example.com/lease.pdf".to_string(),
            file_path: "u/documents/1-lease.pdf".to_string(),
        };
        let value = serde_json::to_value(row).unwrap();
        assert_eq!(value["document_name"], "Lease");
    }
}
