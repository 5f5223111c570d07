//! Runtime configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::sensor::PositionOptions;

/// Default geocoding endpoint (Google Geocoding API, JSON output).
pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
/// Postal code whose location is the center of the service area.
pub const DEFAULT_POSTAL_CODE: &str = "400022";
/// Service radius around the reference point.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("{name} has an invalid value {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value found in the environment
        value: String,
    },
}

/// Geocoding provider settings
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    /// API key sent with every request
    pub api_key: String,
    /// Endpoint URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Complete resolver configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Geocoding provider settings
    pub geocoding: GeocodingConfig,
    /// Postal code that anchors the service area
    pub postal_code: String,
    /// Service radius in kilometers
    pub radius_km: f64,
    /// Sensor options for current-position requests
    pub position: PositionOptions,
    /// Directory for persisted stores; `None` keeps state in memory
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Builds a configuration with defaults for everything except the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            geocoding: GeocodingConfig {
                api_key: api_key.into(),
                base_url: DEFAULT_GEOCODING_URL.to_string(),
                timeout: Duration::from_secs(10),
            },
            postal_code: DEFAULT_POSTAL_CODE.to_string(),
            radius_km: DEFAULT_RADIUS_KM,
            position: PositionOptions::default(),
            state_dir: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEOCODING_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GEOCODING_API_KEY"))?;

        let mut config = Self::new(api_key);

        if let Ok(url) = env::var("GEOCODING_BASE_URL") {
            config.geocoding.base_url = url;
        }
        config.geocoding.timeout =
            Duration::from_secs(parse_or("GEOCODING_TIMEOUT_SECS", 10u64)?);

        if let Ok(code) = env::var("SERVICE_POSTAL_CODE") {
            config.postal_code = code;
        }
        config.radius_km = parse_or("SERVICE_RADIUS_KM", DEFAULT_RADIUS_KM)?;
        if !(config.radius_km.is_finite() && config.radius_km > 0.0) {
            return Err(ConfigError::Invalid {
                name: "SERVICE_RADIUS_KM",
                value: config.radius_km.to_string(),
            });
        }

        config.position = PositionOptions {
            timeout: Duration::from_secs(parse_or("LOCATION_TIMEOUT_SECS", 15u64)?),
            maximum_age: Duration::from_secs(parse_or("LOCATION_MAX_AGE_SECS", 10u64)?),
        };

        config.state_dir = env::var("SERVICEAREA_STATE_DIR").ok().map(PathBuf::from);

        Ok(config)
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
