use chrono::Utc;
use hearth_core::command::TaskCommand;
use hearth_core::models::{Priority, TaskId, TaskSort};
use hearth_core::{ClientConfig, Command, WorkDashboard};

use crate::cli::{PriorityArg, SortArg, TaskCommands};
use crate::commands::common::{
    check_notice, format_task_columns, normalize_content, parse_date, signed_in, SignedIn,
    TaskColumnsJson,
};
use crate::error::CliError;

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

impl From<SortArg> for TaskSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => Self::Newest,
            SortArg::Priority => Self::Priority,
            SortArg::Due => Self::DueDate,
        }
    }
}

pub async fn run_tasks(command: TaskCommands, config: &ClientConfig) -> Result<(), CliError> {
    let SignedIn {
        session,
        backend,
        storage,
    } = signed_in(config).await?;
    let mut dashboard = WorkDashboard::new(backend, storage, session.user.id);
    dashboard.load_tasks().await?;

    let (command, done) = match command {
        TaskCommands::List { sort, json } => {
            dashboard.set_sort(sort.into());
            let columns = dashboard.columns();
            if json {
                let items = TaskColumnsJson::from(&columns);
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for line in format_task_columns(&columns) {
                    println!("{line}");
                }
            }
            return Ok(());
        }
        TaskCommands::Add {
            content,
            priority,
            due,
            category,
        } => {
            let content = normalize_content(&content)?;
            let due_date = due.as_deref().map(parse_date).transpose()?;
            let command = TaskCommand::Add {
                content,
                priority: priority.into(),
                due_date,
                category,
            };
            (command, "Added task")
        }
        TaskCommands::Done { id } => (TaskCommand::ToggleComplete(TaskId(id)), "Updated task"),
        TaskCommands::Pin { id } => (TaskCommand::TogglePin(TaskId(id)), "Updated task"),
        TaskCommands::Delete { id } => (TaskCommand::Delete(TaskId(id)), "Deleted task"),
    };

    check_notice(dashboard.dispatch(Command::Task(command), Utc::now()).await)?;
    println!("{done}");
    Ok(())
}
