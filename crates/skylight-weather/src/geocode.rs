//! Forward geocoding: free-text place search via the Open-Meteo
//! geocoding endpoint. Only the best match is used — there is no
//! disambiguation UI.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use skylight_core::LocationRecord;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Geocoding errors. `NoMatches` is a user-visible state, not a fault.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("no matches for query")]
    NoMatches,
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GeocodeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeocodeError::Network(_) => "Location search failed",
            GeocodeError::NoMatches => "No matching locations found",
            GeocodeError::Parse(_) => "Location service sent an unexpected reply",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<SearchResult>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
    timezone: Option<String>,
}

/// The best match for a search query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
}

impl GeocodeMatch {
    /// Display label: place name plus country code when known,
    /// e.g. "Tokyo, JP".
    pub fn label(&self) -> String {
        match self.country_code.as_deref() {
            Some(cc) if !cc.is_empty() => format!("{}, {}", self.name, cc),
            _ => self.name.clone(),
        }
    }

    /// The full record persisted under `customLocation`.
    pub fn to_location_record(&self) -> LocationRecord {
        LocationRecord {
            latitude: self.latitude,
            longitude: self.longitude,
            label: Some(self.label()),
            timezone: self.timezone.clone(),
        }
    }
}

/// Client for the geocoding search endpoint.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: Url,
}

impl GeocodeClient {
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client somewhere else (tests use a mock server).
    pub fn with_base_url(base_url: &str) -> Result<Self, GeocodeError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GeocodeError::Parse(format!("invalid base url: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Search for a place and return the first result.
    pub async fn search_first(&self, query: &str) -> Result<GeocodeMatch, GeocodeError> {
        let mut url = self
            .base_url
            .join("/v1/search")
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("name", query)
            .append_pair("count", "1");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: SearchResponse = response.json().await?;

        let first = body
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoMatches)?;

        tracing::info!("Geocoded '{}' to {}", query, first.name);
        Ok(GeocodeMatch {
            name: first.name,
            latitude: first.latitude,
            longitude: first.longitude,
            country_code: first.country_code,
            timezone: first.timezone,
        })
    }
}
