use chrono::Utc;
use hearth_core::live_map::{HeadlessMap, MarkerChange};
use hearth_core::{ClientConfig, LiveMapView, PollingFeed};
use tokio::time::{interval, MissedTickBehavior};

use crate::commands::common::{format_location_line, signed_in, SignedIn};
use crate::error::CliError;

pub async fn run_map(watch: bool, as_json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let SignedIn { backend, .. } = signed_in(config).await?;
    let feed = PollingFeed::new(backend.clone(), config.location_poll_interval());
    let mut view = LiveMapView::<HeadlessMap>::new(config.marker_stale_after());

    let count = view.enter(&backend, &feed, Utc::now()).await?;
    print_snapshot(&view, as_json)?;
    if !watch {
        view.exit();
        return Ok(());
    }

    tracing::info!("Watching {count} shared locations");
    let mut sweep = interval(config.location_poll_interval());
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            change = view.pump(Utc::now()) => {
                let Some(change) = change else {
                    tracing::warn!("Location feed closed");
                    break;
                };
                print_change(&view, change, as_json)?;
            }
            _ = sweep.tick() => {
                for id in view.sweep(Utc::now()) {
                    print_change(&view, MarkerChange::Removed(id), as_json)?;
                }
            }
        }
    }

    view.exit();
    Ok(())
}

fn print_snapshot(view: &LiveMapView<HeadlessMap>, as_json: bool) -> Result<(), CliError> {
    let locations = view.reconciler().locations();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
    } else if locations.is_empty() {
        println!("Nobody is sharing their location");
    } else {
        let now = Utc::now();
        for location in locations {
            println!("{}", format_location_line(location, now));
        }
    }
    Ok(())
}

fn print_change(
    view: &LiveMapView<HeadlessMap>,
    change: MarkerChange,
    as_json: bool,
) -> Result<(), CliError> {
    let (label, id) = match change {
        MarkerChange::Added(id) => ("added", id),
        MarkerChange::Moved(id) => ("moved", id),
        MarkerChange::Removed(id) => ("removed", id),
    };
    let location = view.reconciler().location(id);
    if as_json {
        let line = serde_json::json!({ "change": label, "id": id, "location": location });
        println!("{}", serde_json::to_string(&line)?);
    } else if let Some(location) = location {
        println!("{label}: {}", format_location_line(location, Utc::now()));
    } else {
        println!("{label}: {id}");
    }
    Ok(())
}
