//! Geocoding provider client.
//!
//! The provider is a black-box HTTP JSON API: a `GET` with either `latlng` or
//! `address` plus an API key, answering with a `results` array. An empty array means
//! "no match" and is not an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GeocodingConfig;
use crate::error::LocationError;
use crate::types::Coordinate;

/// Provider response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodeResponse {
    /// Matches, best first
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    /// Provider status string, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Provider explanation accompanying an error status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GeocodeResponse {
    /// The matches, or the failure the provider reported in `status`.
    ///
    /// `OK` and `ZERO_RESULTS` are answers (the latter an empty one), as is a body
    /// without a status. Quota and server-side statuses are transient; anything else,
    /// such as a rejected key, is not.
    pub fn into_results(self) -> Result<Vec<GeocodeResult>, LocationError> {
        let status = match self.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => return Ok(self.results),
            Some(status) => status,
        };

        let transient = matches!(status, "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR");
        let message = match &self.error_message {
            Some(detail) => format!("provider status {status}: {detail}"),
            None => format!("provider status {status}"),
        };
        Err(LocationError::transport(message, transient))
    }
}

/// A single geocoding match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Human-readable address
    pub formatted_address: String,
    /// Location of the match
    pub geometry: Geometry,
}

/// Geometry block of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Point of the match
    pub location: LatLng,
}

/// Provider coordinate encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

impl GeocodeResult {
    /// Builds a result from an address and a coordinate.
    pub fn new(formatted_address: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            formatted_address: formatted_address.into(),
            geometry: Geometry {
                location: LatLng {
                    lat: coordinate.latitude,
                    lng: coordinate.longitude,
                },
            },
        }
    }

    /// The match location as a [`Coordinate`].
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.geometry.location.lat, self.geometry.location.lng)
    }
}

/// A geocoding provider able to translate between coordinates and addresses.
///
/// Implementations return every match the provider produced; an empty vector is a
/// valid "no match" answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Reverse geocode a coordinate into address matches.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeResult>, LocationError>;

    /// Forward geocode a free-text query or postal code.
    async fn forward(&self, query: &str) -> Result<Vec<GeocodeResult>, LocationError>;
}

/// Geocoder backed by the HTTP provider.
///
/// Each request carries an explicit timeout and is retried once after a short
/// delay when the failure is transient (connect error, timeout, 5xx or 429).
#[derive(Clone)]
pub struct HttpGeocoder {
    client: Client,
    base_url: Url,
    api_key: String,
    retry_delay: Duration,
}

impl HttpGeocoder {
    /// Create a new geocoder from provider settings.
    pub fn new(config: &GeocodingConfig) -> Result<Self, LocationError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LocationError::transport(format!("invalid base url: {e}"), false))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| LocationError::transport(format!("http client: {e}"), false))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Override the pause before the single retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn request_url(&self, param: &str, value: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(param, value)
            .append_pair("key", &self.api_key);
        url
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<GeocodeResult>, LocationError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let transient = status.is_server_error() || status.as_u16() == 429;
            return Err(LocationError::transport(format!("HTTP {status}"), transient));
        }
        let body = response
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| LocationError::transport(format!("invalid response body: {e}"), false))?;
        tracing::debug!(
            results = body.results.len(),
            status = body.status.as_deref().unwrap_or(""),
            "geocoding response"
        );
        body.into_results()
    }

    async fn fetch_with_retry(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<Vec<GeocodeResult>, LocationError> {
        match self.fetch(&url).await {
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    operation,
                    error = %e,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "geocoding request failed, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                self.fetch(&url).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeResult>, LocationError> {
        let latlng = format!("{},{}", coordinate.latitude, coordinate.longitude);
        let url = self.request_url("latlng", &latlng);
        self.fetch_with_retry("reverse", url).await
    }

    async fn forward(&self, query: &str) -> Result<Vec<GeocodeResult>, LocationError> {
        let url = self.request_url("address", query);
        self.fetch_with_retry("forward", url).await
    }
}
