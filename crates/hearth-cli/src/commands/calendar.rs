use chrono::{NaiveDate, NaiveTime, Utc};
use hearth_core::command::CalendarCommand;
use hearth_core::{ClientConfig, Command, ItemKey, VisibleRange, WorkDashboard};

use crate::cli::CalendarCommands;
use crate::commands::common::{
    check_notice, format_calendar_line, parse_date, parse_when, signed_in, SignedIn,
};
use crate::error::CliError;

pub async fn run_calendar(command: CalendarCommands, config: &ClientConfig) -> Result<(), CliError> {
    let SignedIn {
        session,
        backend,
        storage,
    } = signed_in(config).await?;
    let mut dashboard = WorkDashboard::new(backend, storage, session.user.id);
    let today = Utc::now().date_naive();

    match command {
        CalendarCommands::List { from, to, json } => {
            let from = from.as_deref().map(parse_date).transpose()?;
            let to = to.as_deref().map(parse_date).transpose()?;
            let range = list_range(from, to, today)?;
            check_notice(
                dashboard
                    .dispatch(
                        Command::Calendar(CalendarCommand::ShowRange(range)),
                        Utc::now(),
                    )
                    .await,
            )?;

            let items = dashboard
                .calendar()
                .map(|board| board.items())
                .unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(items)?);
            } else if items.is_empty() {
                println!("Nothing scheduled");
            } else {
                for item in items {
                    println!("{}", format_calendar_line(item));
                }
            }
            Ok(())
        }
        CalendarCommands::Move { item, to, month } => {
            let key: ItemKey = item.parse()?;
            let start = parse_when(&to)?;
            let month = month.as_deref().map(parse_date).transpose()?.unwrap_or(today);

            dashboard.load_tasks().await?;
            dashboard.show_calendar(VisibleRange::month(month)?).await?;
            let current = dashboard
                .calendar()
                .and_then(|board| board.item(key))
                .ok_or_else(|| {
                    CliError::Notice(format!(
                        "{key} is not on the calendar in {}",
                        month.format("%B %Y")
                    ))
                })?;
            let end = current.end.map(|end| start + (end - current.start));

            check_notice(
                dashboard
                    .dispatch(
                        Command::Calendar(CalendarCommand::Move { key, start, end }),
                        Utc::now(),
                    )
                    .await,
            )?;
            println!("Moved {key} to {}", start.format("%Y-%m-%d %H:%M"));
            Ok(())
        }
    }
}

/// `from..=to` in whole days. Without `to` the range runs to the end of the
/// month `from` is in; without either it is the current month.
pub(crate) fn list_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<VisibleRange, CliError> {
    let range = match (from, to) {
        (Some(from), Some(to)) => VisibleRange::days(from, to)?,
        (Some(from), None) => {
            let month = VisibleRange::month(from)?;
            VisibleRange::new(from.and_time(NaiveTime::MIN).and_utc(), month.end)?
        }
        (None, Some(to)) => {
            let month = VisibleRange::month(to)?;
            VisibleRange::days(month.start_date(), to)?
        }
        (None, None) => VisibleRange::month(today)?,
    };
    Ok(range)
}
