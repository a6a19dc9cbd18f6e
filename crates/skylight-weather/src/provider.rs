//! Open-Meteo current-weather client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use skylight_core::Coordinates;
use url::Url;

use crate::types::CurrentConditions;

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Weather fetch errors.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(_) => "Error loading weather",
            WeatherError::Parse(_) => "Weather service sent an unexpected reply",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeatherBody>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBody {
    temperature: f64,
    weathercode: i32,
}

/// Client for the forecast endpoint. Cheap to clone; the underlying
/// connection pool is shared.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: Url,
}

impl ForecastClient {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client somewhere else (tests use a mock server).
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WeatherError::Parse(format!("invalid base url: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Fetch current conditions for the given coordinates.
    pub async fn fetch_current(
        &self,
        coordinates: Coordinates,
    ) -> Result<CurrentConditions, WeatherError> {
        let mut url = self
            .base_url
            .join("/v1/forecast")
            .map_err(|e| WeatherError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("latitude", &coordinates.latitude.to_string())
            .append_pair("longitude", &coordinates.longitude.to_string())
            .append_pair("current_weather", "true")
            .append_pair("timezone", "auto");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: ForecastResponse = response.json().await?;

        let current = body
            .current_weather
            .ok_or_else(|| WeatherError::Parse("response missing current_weather".into()))?;

        tracing::debug!(
            "Fetched weather: {}°C, code {}",
            current.temperature,
            current.weathercode
        );
        Ok(CurrentConditions {
            temperature_c: current.temperature,
            weather_code: current.weathercode,
        })
    }
}
