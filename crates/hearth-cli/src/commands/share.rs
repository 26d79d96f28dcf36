use chrono::Utc;
use hearth_core::live_map::Position;
use hearth_core::models::GeoPoint;
use hearth_core::{ClientConfig, LocationSharing, PublicPage};

use crate::commands::common::{signed_in, SignedIn};
use crate::error::CliError;

pub async fn run_share(lat: f64, lng: f64, config: &ClientConfig) -> Result<(), CliError> {
    validate_coordinates(lat, lng)?;
    let SignedIn {
        session,
        backend,
        storage,
    } = signed_in(config).await?;

    let page = PublicPage::new(backend.clone(), storage);
    let profile = page.get_profile(session.user.id).await?;
    let icon_url = profile
        .as_ref()
        .and_then(|profile| profile.icon_url.clone())
        .or_else(|| session.user.avatar_url.clone());
    let display_name = profile
        .and_then(|profile| profile.display_name)
        .unwrap_or_else(|| session.user.display_name.clone());

    let sharing = LocationSharing::new(&backend, session.user.id, display_name, icon_url);
    sharing
        .publish(&Position {
            point: GeoPoint::new(lat, lng),
            accuracy_m: None,
            taken_at: Utc::now(),
        })
        .await?;
    println!("Shared {lat:.5}, {lng:.5}");
    Ok(())
}

pub(crate) fn validate_coordinates(lat: f64, lng: f64) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(CliError::InvalidCoordinates { lat, lng });
    }
    Ok(())
}
