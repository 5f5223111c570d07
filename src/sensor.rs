//! Device location sensor capability.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::LocationError;
use crate::types::Coordinate;

/// Options for a single current-position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// How long to wait for a fix
    pub timeout: Duration,
    /// Oldest cached fix that is still acceptable
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(10),
        }
    }
}

/// A position reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Reported position
    pub coordinate: Coordinate,
    /// When the position was measured
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// A fix measured right now.
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            timestamp: Utc::now(),
        }
    }

    /// Whether the fix is recent enough for `maximum_age`.
    pub fn is_fresh(&self, maximum_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        age.to_std().map_or(true, |age| age <= maximum_age)
    }
}

/// Errors on the sensor's own error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// Platform reported that location access is denied
    #[error("permission denied")]
    PermissionDenied,
    /// Platform could not determine the position
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    /// No fix arrived within the requested timeout
    #[error("timeout")]
    Timeout,
}

impl From<SensorError> for LocationError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::PermissionDenied => LocationError::PermissionDenied,
            SensorError::PositionUnavailable(reason) => LocationError::LocationUnavailable(reason),
            SensorError::Timeout => LocationError::LocationTimeout,
        }
    }
}

/// Source of current-position fixes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationSensor: Send + Sync {
    /// Request the current position.
    async fn current_fix(&self, options: PositionOptions) -> Result<Fix, SensorError>;
}

/// Sensor that always reports the same position.
///
/// Stands in for the device sensor on hosts without one; the fix is re-stamped on
/// every request so it is never older than `maximum_age`.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    coordinate: Option<Coordinate>,
}

impl FixedSensor {
    /// A sensor reporting `coordinate`.
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
        }
    }

    /// A sensor that never finds a position.
    pub fn unavailable() -> Self {
        Self { coordinate: None }
    }
}

#[async_trait]
impl LocationSensor for FixedSensor {
    async fn current_fix(&self, _options: PositionOptions) -> Result<Fix, SensorError> {
        self.coordinate
            .map(Fix::now)
            .ok_or_else(|| SensorError::PositionUnavailable("no position source".to_string()))
    }
}
