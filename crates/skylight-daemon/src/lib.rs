//! Background refresher: the process-wide singleton that keeps the
//! weather cache warm even when no page is open.
//!
//! Every 30 minutes it fetches current weather for the stored location,
//! writes the snapshot to the store, and broadcasts a refresh
//! notification to every registered tab. This deliberately overlaps the
//! overlay's own 15-minute loop — both are idempotent overwrites of the
//! same upstream truth, so no reconciliation is attempted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use skylight_core::{ContextBus, Payload, Settings, StoreError, SyncStore};
use skylight_weather::{ForecastClient, WeatherSnapshot};
use tokio::time::MissedTickBehavior;

/// Cache-warming cadence.
pub const BACKGROUND_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub struct BackgroundRefresher {
    store: Arc<SyncStore>,
    bus: Arc<ContextBus>,
    forecast: ForecastClient,
}

impl BackgroundRefresher {
    pub fn new(store: Arc<SyncStore>, bus: Arc<ContextBus>, forecast: ForecastClient) -> Self {
        Self {
            store,
            bus,
            forecast,
        }
    }

    /// First-run installation: persist defaults for any settings key
    /// that has never been written. Keys the user already changed are
    /// left alone, so this is safe to call on every startup.
    pub fn install_defaults(&self) -> Result<(), StoreError> {
        let present = self.store.get(&Settings::store_keys())?;
        let missing: Vec<_> = Settings::default()
            .to_entries()
            .into_iter()
            .filter(|(key, _)| !present.contains_key(key))
            .collect();
        if !missing.is_empty() {
            tracing::info!("Installing {} default settings", missing.len());
            self.store.set(missing)?;
        }
        Ok(())
    }

    /// One cache-warming pass. Returns whether a fetch happened: with no
    /// stored location the tick is skipped — the default location is a
    /// rendering-path fallback, not something the daemon invents.
    pub async fn refresh_once(&self) -> Result<bool, StoreError> {
        let Some(active) = self.store.stored_location()? else {
            tracing::debug!("No stored location; skipping background refresh");
            return Ok(false);
        };

        match self.forecast.fetch_current(active.coordinates).await {
            Ok(conditions) => {
                WeatherSnapshot::from_conditions(conditions, Utc::now()).save(&self.store)?;
                let reached = self.bus.broadcast(Payload::RefreshWeather);
                tracing::debug!("Weather cache warmed; notified {} tabs", reached);
                Ok(true)
            }
            Err(e) => {
                // Transient by taxonomy; the cache simply stays stale
                // until the next tick.
                tracing::warn!("Background weather update error: {}", e);
                Ok(false)
            }
        }
    }

    /// Run for the life of the process. The first refresh happens one
    /// full interval after startup.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(BACKGROUND_REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Swallow the immediate first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_once().await {
                tracing::warn!("Background refresh failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylight_core::store::keys;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(server_uri: &str) -> (Arc<SyncStore>, Arc<ContextBus>, BackgroundRefresher) {
        let store = Arc::new(SyncStore::open_in_memory().unwrap());
        let bus = Arc::new(ContextBus::new());
        let refresher = BackgroundRefresher::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            ForecastClient::with_base_url(server_uri).unwrap(),
        );
        (store, bus, refresher)
    }

    #[tokio::test]
    async fn install_defaults_persists_fresh_install_state() {
        let server = MockServer::start().await;
        let (store, _bus, refresher) = fixture(&server.uri());

        refresher.install_defaults().unwrap();

        let values = store.get(&Settings::store_keys()).unwrap();
        assert_eq!(values[keys::WIDGET_ENABLED], serde_json::json!(true));
        assert_eq!(values[keys::TIME_ENABLED], serde_json::json!(true));
        assert_eq!(values[keys::IS_CELSIUS], serde_json::json!(false));
        assert_eq!(values[keys::WIDGET_ANCHOR], serde_json::json!("top-right"));
    }

    #[tokio::test]
    async fn install_defaults_never_overwrites_user_choices() {
        let server = MockServer::start().await;
        let (store, _bus, refresher) = fixture(&server.uri());
        store
            .set_one(keys::WIDGET_ENABLED, serde_json::json!(false))
            .unwrap();

        refresher.install_defaults().unwrap();
        refresher.install_defaults().unwrap();

        assert!(!store.settings().unwrap().widget_enabled);
    }

    #[tokio::test]
    async fn tick_without_stored_location_skips_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (store, _bus, refresher) = fixture(&server.uri());

        assert!(!refresher.refresh_once().await.unwrap());
        assert!(store.get_one(keys::LAST_WEATHER_DATA).unwrap().is_none());
    }

    #[tokio::test]
    async fn tick_warms_cache_and_broadcasts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "52.52"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_weather": {
                    "temperature": 4.5,
                    "weathercode": 71,
                    "time": "2026-02-01T09:00"
                }
            })))
            .mount(&server)
            .await;
        let (store, bus, refresher) = fixture(&server.uri());
        store
            .set_one(
                keys::LAST_LOCATION,
                serde_json::json!({"latitude": 52.52, "longitude": 13.405}),
            )
            .unwrap();
        let (_tab, mut mailbox) = bus.register();

        assert!(refresher.refresh_once().await.unwrap());

        let snapshot = WeatherSnapshot::load(&store).unwrap().unwrap();
        assert!((snapshot.temperature_c - 4.5).abs() < 1e-9);
        assert_eq!(snapshot.weather_code, 71);

        let envelope = mailbox.recv().await.unwrap();
        assert!(matches!(envelope.payload, Payload::RefreshWeather));
        assert!(envelope.ack.is_none());
    }

    #[tokio::test]
    async fn tick_prefers_custom_location() {
        let server = MockServer::start().await;
        // Only the custom coordinates are answered.
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "35.6895"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_weather": {
                    "temperature": 25.0,
                    "weathercode": 0,
                    "time": "2026-02-01T09:00"
                }
            })))
            .mount(&server)
            .await;
        let (store, _bus, refresher) = fixture(&server.uri());
        store
            .set_one(
                keys::LAST_LOCATION,
                serde_json::json!({"latitude": 52.52, "longitude": 13.405}),
            )
            .unwrap();
        store
            .set_one(
                keys::CUSTOM_LOCATION,
                serde_json::json!({
                    "latitude": 35.6895,
                    "longitude": 139.6917,
                    "label": "Tokyo, JP",
                    "timezone": "Asia/Tokyo"
                }),
            )
            .unwrap();

        assert!(refresher.refresh_once().await.unwrap());
        assert!(WeatherSnapshot::load(&store).unwrap().is_some());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_cache_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (store, _bus, refresher) = fixture(&server.uri());
        store
            .set_one(
                keys::LAST_LOCATION,
                serde_json::json!({"latitude": 1.0, "longitude": 2.0}),
            )
            .unwrap();

        assert!(!refresher.refresh_once().await.unwrap());
        assert!(store.get_one(keys::LAST_WEATHER_DATA).unwrap().is_none());
    }
}
