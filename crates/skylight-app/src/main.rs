//! Demo host: one store, one bus, the background refresher, and a single
//! overlay runtime rendering to the log.

use std::sync::Arc;

use anyhow::{Context, Result};
use skylight_core::{ContextBus, SyncStore};
use skylight_daemon::BackgroundRefresher;
use skylight_overlay::{ContentRuntime, TracingSurface, Viewport};
use skylight_panel::PanelController;
use skylight_weather::{ForecastClient, GeocodeClient, SystemLocator};

#[tokio::main]
async fn main() -> Result<()> {
    skylight_core::init()?;

    let store_path = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("skylight")
        .join("store.db");
    let store = Arc::new(SyncStore::open(&store_path)?);
    let bus = Arc::new(ContextBus::new());
    let forecast = ForecastClient::new()?;

    let refresher = BackgroundRefresher::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        forecast.clone(),
    );
    refresher.install_defaults()?;

    let mut overlay = ContentRuntime::connect(
        Arc::clone(&store),
        &bus,
        forecast.clone(),
        Arc::new(TracingSurface),
        Viewport {
            width: 1280.0,
            height: 720.0,
        },
    )?;

    tracing::info!(
        "Skylight started (store: {}, overlay tab {})",
        store_path.display(),
        overlay.tab_id()
    );

    // One panel open at startup, the way the settings panel would show a
    // snapshot on demand.
    let mut panel = PanelController::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        forecast,
        GeocodeClient::new()?,
        SystemLocator,
        Some(overlay.tab_id()),
    );
    match panel.open().await {
        Ok(snapshot) => {
            let weather = snapshot
                .weather
                .map(|w| format!("{} {}", w.glyph, w.temperature))
                .unwrap_or_else(|| "weather unavailable".to_string());
            tracing::info!(
                "{} · {} · {} ({})",
                snapshot.time,
                snapshot.date,
                weather,
                snapshot.location_label.as_deref().unwrap_or("unknown location"),
            );
        }
        Err(e) => tracing::warn!("Panel snapshot failed: {}", e),
    }

    tokio::select! {
        _ = overlay.run() => {}
        _ = refresher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
