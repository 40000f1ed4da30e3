use std::env;
use std::sync::Arc;

use routecast::api::HealthAPI;
use routecast::config::Config;
use routecast::entities::{Coordinates, RouteRequest};
use routecast::error::{config_error, unexpected_error, Error};
use routecast::external::RouteBackend;
use routecast::jobs::{JobClient, JobEvent};
use routecast::map::{FixedChrome, InMemorySurface, MapEvent, MapSurface, MapSyncEngine, Theme};
use routecast::navigation::{GpsFix, NavigationCoordinator};

const SAO_PAULO: Coordinates = Coordinates {
    lat: -23.5505,
    lon: -46.6333,
};
const RIO_DE_JANEIRO: Coordinates = Coordinates {
    lat: -22.9068,
    lon: -43.1729,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    let backend = Arc::new(RouteBackend::new(&config)?);

    match backend.health().await {
        Ok(health) if health.is_healthy() => {
            tracing::info!(version = %health.version, "backend healthy")
        }
        Ok(health) => tracing::warn!(status = %health.status, "backend degraded"),
        Err(err) => tracing::warn!("health check failed: {}", err),
    }

    let origin = coordinates_from_env("ROUTE_ORIGIN", SAO_PAULO)?;
    let destination = coordinates_from_env("ROUTE_DESTINATION", RIO_DE_JANEIRO)?;

    let jobs = JobClient::new(backend.clone(), config.poll);
    let events = jobs.subscribe();
    let handle = jobs.submit(RouteRequest::new(origin, destination)).await?;
    tracing::info!(route_id = ?handle.route_id, "analysis submitted");

    let result = match events.recv().await {
        Ok(JobEvent::Result(result)) => result,
        Ok(JobEvent::Error(err)) => return Err(err),
        Err(_) => return Err(unexpected_error()),
    };

    let mut surface = InMemorySurface::loaded(Theme::Light.style_url());
    let mut map = MapSyncEngine::attach(&surface, Theme::Light);
    map.dispatch(&mut surface, MapEvent::ResultChanged(Some(result.clone())))?;
    map.fit_route(&mut surface, &FixedChrome::default());

    if let Some(summary) = &result.summary {
        tracing::info!(
            distance_km = summary.distance_km,
            duration_minutes = summary.duration_minutes,
            risk = ?summary.overall_risk,
            "{}",
            summary.recommendation
        );
    }
    tracing::info!(layers = ?surface.layer_ids(), "overlays on map");

    let mut navigation = NavigationCoordinator::from_config(&config);
    navigation.set_route(&result);
    if let Err(err) = navigation
        .prefetch_nearby(backend.as_ref(), origin, config.nearby_signals_radius_m)
        .await
    {
        tracing::warn!("nearby signals unavailable: {}", err);
    }

    let update = navigation.on_location(GpsFix::new(origin));
    match update.signal {
        Some(active) => tracing::info!(
            distance_m = active.distance_m,
            phase = active.phase.phase.name(),
            remaining = active.phase.remaining_seconds,
            "signal ahead"
        ),
        None => tracing::info!("no signal within {} m", config.signal_radius_m),
    }

    Ok(())
}

/// Reads `lat,lon` from `key`, falling back to `default` when unset.
fn coordinates_from_env(key: &str, default: Coordinates) -> Result<Coordinates, Error> {
    let Ok(value) = env::var(key) else {
        return Ok(default);
    };

    let parsed = value
        .split_once(',')
        .and_then(|(lat, lon)| {
            let lat = lat.trim().parse().ok()?;
            let lon = lon.trim().parse().ok()?;
            Some(Coordinates::new(lat, lon))
        })
        .filter(|c| c.is_valid());

    parsed.ok_or_else(|| config_error(format!("{} must be `lat,lon`, got {:?}", key, value)))
}
