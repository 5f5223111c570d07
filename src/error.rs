//! Error taxonomy for the location pipeline.

use thiserror::Error;

/// Failures surfaced by permission checks, the location sensor and the geocoder.
///
/// Sensor and permission failures are meant to reach the calling screen. Geocoding
/// failures are soft: most callers go through the `Option` returning helpers on
/// [`LocationResolver`](crate::LocationResolver) and fall back to raw coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused location access
    #[error("location permission denied")]
    PermissionDenied,

    /// The current platform has no location permission identifier
    #[error("location permission is not supported on this platform")]
    PermissionUnsupportedPlatform,

    /// The sensor did not produce a fix within the allowed time
    #[error("timed out waiting for a location fix")]
    LocationTimeout,

    /// The sensor could not determine a position
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// The geocoder answered with an empty result list
    #[error("no geocoding result for {0:?}")]
    GeocodeNoResult(String),

    /// The geocoding request failed in transport, status or decoding
    #[error("geocoding request failed: {message}")]
    GeocodeTransportFailure {
        /// Human-readable cause
        message: String,
        /// Whether a repeat of the same request may succeed
        transient: bool,
    },

    /// The resolver was cancelled while the operation was in flight
    #[error("location request cancelled")]
    Cancelled,
}

impl LocationError {
    /// Convenience constructor for transport failures.
    pub fn transport(message: impl Into<String>, transient: bool) -> Self {
        Self::GeocodeTransportFailure {
            message: message.into(),
            transient,
        }
    }

    /// Whether the failure is worth one more attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LocationError::GeocodeTransportFailure {
                transient: true,
                ..
            }
        )
    }

    /// Message suited for the user-facing alert a screen shows on failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied | LocationError::PermissionUnsupportedPlatform => {
                "Please enable location services in your device settings to use this feature."
            }
            LocationError::LocationTimeout | LocationError::LocationUnavailable(_) => {
                "Unable to get your current location. Please try again or select location manually."
            }
            LocationError::GeocodeNoResult(_) => "No location found for this postal code.",
            LocationError::GeocodeTransportFailure { .. } => {
                "Failed to find location. Please try again."
            }
            LocationError::Cancelled => "Location request cancelled.",
        }
    }
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        let transient = err.is_timeout()
            || err.is_connect()
            || err
                .status()
                .is_some_and(|status| status.is_server_error() || status.as_u16() == 429);
        LocationError::transport(err.to_string(), transient)
    }
}
