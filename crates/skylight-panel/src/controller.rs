//! The panel controller: settings form, location search, and the
//! weather/time snapshot shown while the panel is open.
//!
//! Every write goes to the store first (the durable path) and is then
//! pushed to the active tab directly as a latency shortcut. A tab
//! without a content runtime is tolerated silently.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use skylight_core::{
    clock, BusError, ContextBus, Coordinates, LocationRecord, Payload, Settings, StoreError,
    SyncStore, TabId, WidgetAnchor,
};
use skylight_core::store::keys;
use skylight_weather::{
    ForecastClient, GeoSource, GeocodeClient, GeocodeError, WeatherCondition,
};

/// Status line shown under the panel form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    Idle,
    /// A search is in flight; the search control is disabled.
    Searching,
    /// Rejected locally — no request was made.
    EmptyQuery,
    /// Search succeeded; the label is the new custom location.
    LocationSet(String),
    NoMatches,
    SearchFailed,
    /// Geolocation was denied or unavailable; showing the default
    /// location instead.
    UsingDefaultLocation(&'static str),
}

impl PanelStatus {
    pub fn message(&self) -> String {
        match self {
            PanelStatus::Idle => String::new(),
            PanelStatus::Searching => "Searching…".to_string(),
            PanelStatus::EmptyQuery => "Enter a location to search for".to_string(),
            PanelStatus::LocationSet(label) => format!("Showing weather for {}", label),
            PanelStatus::NoMatches => "No matching locations found".to_string(),
            PanelStatus::SearchFailed => "Location search failed".to_string(),
            PanelStatus::UsingDefaultLocation(reason) => (*reason).to_string(),
        }
    }
}

/// Weather as displayed in the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub glyph: String,
    pub temperature: String,
    pub weather_code: i32,
    pub description: &'static str,
}

/// Everything the panel renders on open.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSnapshot {
    pub settings: Settings,
    pub location_label: Option<String>,
    /// `None` is the "Error loading weather" state.
    pub weather: Option<WeatherView>,
    pub timezone: Option<Tz>,
    pub time: String,
    pub date: String,
    pub status: PanelStatus,
}

/// Short-lived controller backing one panel session.
pub struct PanelController<G: GeoSource> {
    store: Arc<SyncStore>,
    bus: Arc<ContextBus>,
    forecast: ForecastClient,
    geocode: GeocodeClient,
    locator: G,
    active_tab: Option<TabId>,
    search_in_flight: bool,
}

impl<G: GeoSource> PanelController<G> {
    pub fn new(
        store: Arc<SyncStore>,
        bus: Arc<ContextBus>,
        forecast: ForecastClient,
        geocode: GeocodeClient,
        locator: G,
        active_tab: Option<TabId>,
    ) -> Self {
        Self {
            store,
            bus,
            forecast,
            geocode,
            locator,
            active_tab,
            search_in_flight: false,
        }
    }

    /// Panel open: one batch load, first-run geolocation if nothing is
    /// stored, then an initial weather/time snapshot.
    pub async fn open(&mut self) -> Result<PanelSnapshot, StoreError> {
        let settings = self.store.settings()?;

        let mut status = PanelStatus::Idle;
        if self.store.stored_location()?.is_none() {
            match self.locator.current().await {
                Ok(coordinates) => {
                    self.store.set_one(
                        keys::LAST_LOCATION,
                        location_value(&LocationRecord::coords_only(coordinates))?,
                    )?;
                }
                Err(e) => {
                    tracing::info!("Geolocation unavailable: {}", e);
                    status = PanelStatus::UsingDefaultLocation(e.user_message());
                }
            }
        }

        let active = self.store.active_location()?;
        let weather = self
            .fetch_weather(active.coordinates, settings.is_celsius)
            .await;
        let now = Utc::now();

        Ok(PanelSnapshot {
            location_label: active.label.clone(),
            timezone: active.timezone,
            time: clock::format_time(now, active.timezone),
            date: clock::format_date(now, active.timezone),
            weather,
            settings,
            status,
        })
    }

    // ---- settings form ---------------------------------------------------

    pub fn set_widget_enabled(&self, enabled: bool) -> Result<Settings, StoreError> {
        self.update_settings(|s| s.widget_enabled = enabled)
    }

    pub fn set_time_enabled(&self, enabled: bool) -> Result<Settings, StoreError> {
        self.update_settings(|s| s.time_enabled = enabled)
    }

    pub fn set_is_celsius(&self, celsius: bool) -> Result<Settings, StoreError> {
        self.update_settings(|s| s.is_celsius = celsius)
    }

    pub fn set_anchor(&self, anchor: WidgetAnchor) -> Result<Settings, StoreError> {
        self.update_settings(|s| s.anchor = anchor)
    }

    pub fn set_transparency(&self, transparency: f64) -> Result<Settings, StoreError> {
        self.update_settings(|s| s.transparency = transparency.clamp(0.0, 1.0))
    }

    /// Re-read, mutate, write the full object, push to the active tab.
    fn update_settings(
        &self,
        mutate: impl FnOnce(&mut Settings),
    ) -> Result<Settings, StoreError> {
        let mut settings = self.store.settings()?;
        mutate(&mut settings);
        self.store.set_settings(&settings)?;
        self.push(Payload::UpdateSettings(settings.clone()));
        Ok(settings)
    }

    /// Best-effort direct message to the active tab. The store write has
    /// already happened, so a missing receiver costs nothing but latency.
    fn push(&self, payload: Payload) {
        let Some(tab) = self.active_tab else {
            return;
        };
        match self.bus.send(tab, payload) {
            Ok(_ack) => {}
            Err(BusError::NoReceiver(tab)) => {
                tracing::debug!("No content runtime in tab {}; store will catch it up", tab);
            }
        }
    }

    // ---- location search -------------------------------------------------

    /// Whether a search is currently in flight (the UI disables the
    /// search control while true).
    pub fn search_in_flight(&self) -> bool {
        self.search_in_flight
    }

    /// Free-text location search. Takes the first geocoding match,
    /// persists both location variants in one batch, and notifies the
    /// active tab. Failure modes write nothing.
    pub async fn search_location(&mut self, query: &str) -> Result<PanelStatus, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(PanelStatus::EmptyQuery);
        }
        if self.search_in_flight {
            return Ok(PanelStatus::Searching);
        }

        self.search_in_flight = true;
        let result = self.geocode.search_first(query).await;
        self.search_in_flight = false;

        match result {
            Ok(best) => {
                let custom = best.to_location_record();
                let last = LocationRecord::coords_only(custom.coordinates());
                self.store.set(vec![
                    (keys::CUSTOM_LOCATION.to_string(), location_value(&custom)?),
                    (keys::LAST_LOCATION.to_string(), location_value(&last)?),
                ])?;
                let label = custom.label.clone().unwrap_or_else(|| best.label());
                self.push(Payload::LocationUpdated(custom));
                Ok(PanelStatus::LocationSet(label))
            }
            Err(GeocodeError::NoMatches) => Ok(PanelStatus::NoMatches),
            Err(e) => {
                tracing::warn!("Location search failed: {}", e);
                Ok(PanelStatus::SearchFailed)
            }
        }
    }

    // ---- weather ---------------------------------------------------------

    /// Manual refresh of the panel's weather display.
    pub async fn refresh_weather(&self) -> Result<Option<WeatherView>, StoreError> {
        let settings = self.store.settings()?;
        let active = self.store.active_location()?;
        Ok(self
            .fetch_weather(active.coordinates, settings.is_celsius)
            .await)
    }

    async fn fetch_weather(
        &self,
        coordinates: Coordinates,
        is_celsius: bool,
    ) -> Option<WeatherView> {
        match self.forecast.fetch_current(coordinates).await {
            Ok(conditions) => {
                let condition = WeatherCondition::from_wmo_code(conditions.weather_code);
                Some(WeatherView {
                    glyph: condition.glyph().to_string(),
                    temperature: skylight_weather::format_temperature(
                        conditions.temperature_c,
                        is_celsius,
                    ),
                    weather_code: conditions.weather_code,
                    description: condition.description(),
                })
            }
            Err(e) => {
                tracing::warn!("Panel weather fetch failed: {}", e);
                None
            }
        }
    }
}

fn location_value(record: &LocationRecord) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::WriteFailed(e.to_string()))
}
