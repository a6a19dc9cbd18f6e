//! Integration tests for the panel controller against mock weather and
//! geocoding services.

use std::future::Future;
use std::sync::Arc;

use skylight_core::store::keys;
use skylight_core::{ContextBus, Coordinates, Payload, SyncStore};
use skylight_panel::{PanelController, PanelStatus};
use skylight_weather::{
    FixedLocator, ForecastClient, GeoSource, GeocodeClient, LocationError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Geolocation that always reports a denied permission prompt.
struct DeniedLocator;

impl GeoSource for DeniedLocator {
    fn current(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send {
        async { Err(LocationError::PermissionDenied) }
    }
}

fn forecast_body(temperature: f64, code: i32) -> serde_json::Value {
    serde_json::json!({
        "current_weather": {
            "temperature": temperature,
            "weathercode": code,
            "time": "2026-02-01T09:00"
        }
    })
}

struct Fixture {
    store: Arc<SyncStore>,
    bus: Arc<ContextBus>,
    forecast: ForecastClient,
    geocode: GeocodeClient,
}

impl Fixture {
    fn new(server_uri: &str) -> Self {
        Self {
            store: Arc::new(SyncStore::open_in_memory().unwrap()),
            bus: Arc::new(ContextBus::new()),
            forecast: ForecastClient::with_base_url(server_uri).unwrap(),
            geocode: GeocodeClient::with_base_url(server_uri).unwrap(),
        }
    }

    fn controller<G: GeoSource>(
        &self,
        locator: G,
        active_tab: Option<skylight_core::TabId>,
    ) -> PanelController<G> {
        PanelController::new(
            Arc::clone(&self.store),
            Arc::clone(&self.bus),
            self.forecast.clone(),
            self.geocode.clone(),
            locator,
            active_tab,
        )
    }
}

#[tokio::test]
async fn open_with_denied_geolocation_falls_back_to_default() {
    let server = MockServer::start().await;
    // Only the New York default is answered.
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "40.7128"))
        .and(query_param("longitude", "-74.006"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(10.0, 2)))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let mut panel = fixture.controller(DeniedLocator, None);
    let snapshot = panel.open().await.unwrap();

    assert!(matches!(snapshot.status, PanelStatus::UsingDefaultLocation(_)));
    assert_eq!(snapshot.location_label.as_deref(), Some("New York"));
    let weather = snapshot.weather.unwrap();
    assert_eq!(weather.temperature, "50°F");
    assert_eq!(weather.weather_code, 2);
    // Denial persists nothing.
    assert!(fixture.store.last_location().unwrap().is_none());
}

#[tokio::test]
async fn open_persists_detected_location_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "51.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(12.0, 0)))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let locator = FixedLocator(Coordinates {
        latitude: 51.5,
        longitude: -0.12,
    });
    let mut panel = fixture.controller(locator, None);
    let snapshot = panel.open().await.unwrap();

    assert_eq!(snapshot.status, PanelStatus::Idle);
    let stored = fixture.store.last_location().unwrap().unwrap();
    assert!((stored.latitude - 51.5).abs() < 1e-9);
    assert!(stored.label.is_none());
    assert!(snapshot.weather.is_some());
}

#[tokio::test]
async fn open_with_stored_location_skips_geolocation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "48.8566"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(18.0, 0)))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    fixture
        .store
        .set_one(
            keys::LAST_LOCATION,
            serde_json::json!({"latitude": 48.8566, "longitude": 2.3522}),
        )
        .unwrap();

    // A locator pointing elsewhere must not be consulted.
    let locator = FixedLocator(Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    });
    let mut panel = fixture.controller(locator, None);
    let snapshot = panel.open().await.unwrap();

    assert!(snapshot.weather.is_some());
    let stored = fixture.store.last_location().unwrap().unwrap();
    assert!((stored.latitude - 48.8566).abs() < 1e-9);
}

#[tokio::test]
async fn setting_change_writes_store_and_pushes_to_active_tab() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(&server.uri());
    let (tab, mut mailbox) = fixture.bus.register();
    let panel = fixture.controller(DeniedLocator, Some(tab));

    let updated = panel.set_time_enabled(false).unwrap();
    assert!(!updated.time_enabled);

    // Durable path first.
    assert!(!fixture.store.settings().unwrap().time_enabled);
    // Direct-push latency shortcut carries the same full object.
    let envelope = mailbox.recv().await.unwrap();
    match envelope.payload {
        Payload::UpdateSettings(pushed) => assert_eq!(pushed, updated),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn setting_change_without_content_runtime_is_silent() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(&server.uri());
    let (tab, mailbox) = fixture.bus.register();
    drop(mailbox);

    let panel = fixture.controller(DeniedLocator, Some(tab));
    // No receiver: still succeeds, the store carries the truth.
    let updated = panel.set_is_celsius(true).unwrap();
    assert!(updated.is_celsius);
    assert!(fixture.store.settings().unwrap().is_celsius);
}

#[tokio::test]
async fn transparency_is_clamped_before_persisting() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(&server.uri());
    let panel = fixture.controller(DeniedLocator, None);

    let updated = panel.set_transparency(7.5).unwrap();
    assert!((updated.transparency - 1.0).abs() < f64::EPSILON);
    assert!((fixture.store.settings().unwrap().transparency - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn empty_query_is_rejected_locally() {
    let server = MockServer::start().await;
    // No mock mounted: any request would 404 and fail the test below.
    let fixture = Fixture::new(&server.uri());
    let mut panel = fixture.controller(DeniedLocator, None);

    let status = panel.search_location("   ").await.unwrap();
    assert_eq!(status, PanelStatus::EmptyQuery);
    assert!(fixture.store.custom_location().unwrap().is_none());
}

#[tokio::test]
async fn successful_search_persists_both_location_variants() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Tokyo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "name": "Tokyo",
                "latitude": 35.6895,
                "longitude": 139.6917,
                "country_code": "JP",
                "timezone": "Asia/Tokyo"
            }]
        })))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let (tab, mut mailbox) = fixture.bus.register();
    let mut panel = fixture.controller(DeniedLocator, Some(tab));

    let status = panel.search_location("Tokyo").await.unwrap();
    assert_eq!(status, PanelStatus::LocationSet("Tokyo, JP".to_string()));

    let custom = fixture.store.custom_location().unwrap().unwrap();
    assert!(custom.label.as_deref().unwrap().starts_with("Tokyo"));
    assert_eq!(custom.timezone.as_deref(), Some("Asia/Tokyo"));

    // Simplified record for consumers unaware of custom locations.
    let last = fixture.store.last_location().unwrap().unwrap();
    assert!((last.latitude - 35.6895).abs() < 1e-9);
    assert!(last.label.is_none());
    assert!(last.timezone.is_none());

    // Active tab was notified of the new location.
    let envelope = mailbox.recv().await.unwrap();
    match envelope.payload {
        Payload::LocationUpdated(record) => {
            assert_eq!(record.label.as_deref(), Some("Tokyo, JP"));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn search_result_switches_panel_clock_timezone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "name": "Tokyo",
                "latitude": 35.6895,
                "longitude": 139.6917,
                "country_code": "JP",
                "timezone": "Asia/Tokyo"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "35.6895"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(25.0, 1)))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let mut panel = fixture.controller(DeniedLocator, None);
    panel.search_location("Tokyo").await.unwrap();

    let snapshot = panel.open().await.unwrap();
    assert_eq!(snapshot.timezone, Some(chrono_tz::Asia::Tokyo));
    assert_eq!(snapshot.location_label.as_deref(), Some("Tokyo, JP"));
    // Subsequent fetches use Tokyo's coordinates (the mock only answers
    // them).
    assert!(snapshot.weather.is_some());
}

#[tokio::test]
async fn zero_results_leaves_every_key_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": []
        })))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    // A custom location from an earlier search must survive.
    fixture
        .store
        .set_one(
            keys::CUSTOM_LOCATION,
            serde_json::json!({
                "latitude": 48.8566,
                "longitude": 2.3522,
                "label": "Paris, FR",
                "timezone": "Europe/Paris"
            }),
        )
        .unwrap();
    let mut events = fixture.store.subscribe();

    let mut panel = fixture.controller(DeniedLocator, None);
    let status = panel.search_location("zzzzzz").await.unwrap();

    assert_eq!(status, PanelStatus::NoMatches);
    let custom = fixture.store.custom_location().unwrap().unwrap();
    assert_eq!(custom.label.as_deref(), Some("Paris, FR"));
    // No store event fired at all.
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn network_failure_surfaces_generic_search_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let mut panel = fixture.controller(DeniedLocator, None);
    let status = panel.search_location("Tokyo").await.unwrap();

    assert_eq!(status, PanelStatus::SearchFailed);
    assert!(fixture.store.custom_location().unwrap().is_none());
    assert!(!panel.search_in_flight());
}

#[tokio::test]
async fn manual_refresh_reports_error_state_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fixture = Fixture::new(&server.uri());
    let panel = fixture.controller(DeniedLocator, None);
    assert!(panel.refresh_weather().await.unwrap().is_none());
}
