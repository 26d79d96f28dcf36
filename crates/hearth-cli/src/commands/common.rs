use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use hearth_core::calendar::{CalendarItem, COMPLETED_CLASS};
use hearth_core::format::{format_due_date, format_time_ago};
use hearth_core::models::{GalleryPhoto, TaskColumns};
use hearth_core::{ClientConfig, LiveLocation, Notice, RestBackend, SupabaseStorage, Task};
use serde::Serialize;

use crate::auth::{require_session, AuthSession};
use crate::error::CliError;

/// Backend and storage clients acting as the signed-in user.
pub struct SignedIn {
    pub session: AuthSession,
    pub backend: RestBackend,
    pub storage: SupabaseStorage,
}

pub async fn signed_in(config: &ClientConfig) -> Result<SignedIn, CliError> {
    let session = require_session(config).await?;
    let backend = RestBackend::new(config)?.with_access_token(&session.access_token);
    let storage = SupabaseStorage::new(config)?.with_access_token(&session.access_token);
    Ok(SignedIn {
        session,
        backend,
        storage,
    })
}

pub fn anonymous(config: &ClientConfig) -> Result<(RestBackend, SupabaseStorage), CliError> {
    Ok((RestBackend::new(config)?, SupabaseStorage::new(config)?))
}

/// Error notices become command failures; anything else is printed.
pub fn check_notice(notice: Option<Notice>) -> Result<(), CliError> {
    match notice {
        Some(notice) if notice.is_error() => Err(CliError::Notice(notice.message)),
        Some(notice) => {
            println!("{}", notice.message);
            Ok(())
        }
        None => Ok(()),
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(raw.to_string()))
}

/// A bare date means midnight UTC; otherwise RFC 3339.
pub fn parse_when(raw: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(date) = parse_date(raw) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|when| when.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidDate(raw.to_string()))
}

pub fn normalize_content(parts: &[String]) -> Result<String, CliError> {
    let content = parts.join(" ");
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyContent);
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Serialize)]
pub struct TaskColumnsJson<'a> {
    pub pinned: &'a [Task],
    pub pending: &'a [Task],
    pub completed: &'a [Task],
}

impl<'a> From<&'a TaskColumns> for TaskColumnsJson<'a> {
    fn from(columns: &'a TaskColumns) -> Self {
        Self {
            pinned: &columns.pinned,
            pending: &columns.pending,
            completed: &columns.completed,
        }
    }
}

pub fn format_task_line(task: &Task) -> String {
    let mark = if task.is_completed { "x" } else { " " };
    let pin = if task.is_pinned { " [pinned]" } else { "" };
    let category = task
        .category
        .as_deref()
        .map(|category| format!(" #{category}"))
        .unwrap_or_default();
    format!(
        "[{mark}] {:>4}  {:<6}  {:<11}  {}{category}{pin}",
        task.id.get(),
        task.priority.as_str(),
        format_due_date(task.due_date),
        task.content
    )
}

pub fn format_task_columns(columns: &TaskColumns) -> Vec<String> {
    let mut lines = Vec::new();
    for (heading, tasks) in [
        ("Pinned", &columns.pinned),
        ("Pending", &columns.pending),
        ("Completed", &columns.completed),
    ] {
        if tasks.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("{heading} ({})", tasks.len()));
        lines.extend(tasks.iter().map(format_task_line));
    }
    if lines.is_empty() {
        lines.push("No tasks".to_string());
    }
    lines
}

pub fn format_location_line(location: &LiveLocation, now: DateTime<Utc>) -> String {
    format!(
        "{}  {:.5}, {:.5}  updated {}",
        location.display_name,
        location.lat,
        location.lng,
        format_time_ago(location.updated_at, now)
    )
}

pub fn format_calendar_line(item: &CalendarItem) -> String {
    let when = if item.all_day {
        item.start.format("%Y-%m-%d").to_string()
    } else {
        let start = item.start.format("%Y-%m-%d %H:%M");
        match item.end {
            Some(end) if end.date_naive() == item.start.date_naive() => {
                format!("{start}-{}", end.format("%H:%M"))
            }
            Some(end) => format!("{start} - {}", end.format("%Y-%m-%d %H:%M")),
            None => start.to_string(),
        }
    };
    let done = if item.class_names.iter().any(|class| class == COMPLETED_CLASS) {
        " (done)"
    } else {
        ""
    };
    let key = item.key.to_string();
    format!(
        "{when:<22}  {:<5}  {key:<9}  {}{done}",
        item.kind().as_str(),
        item.title
    )
}

pub fn format_photo_line(photo: &GalleryPhoto, now: DateTime<Utc>) -> String {
    let added = photo
        .created_at
        .map(|created_at| format_time_ago(created_at, now))
        .unwrap_or_else(|| "-".to_string());
    format!("{:>4}  {added:<18}  {}", photo.id.get(), photo.url)
}
