//! Core data structures for location resolution.
//!
//! This module defines the value types shared by every other module:
//!
//! - [`Coordinate`] - Immutable latitude/longitude pair with distance calculations
//! - [`ServiceArea`] - Reference point and radius that define where service is provided
//! - [`ResolvedLocation`] - A coordinate together with its address and serviceability verdict
//! - [`PermissionState`] - Tri-state location permission as reported by the platform

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean earth radius in kilometers used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// An immutable coordinate pair with distance calculation capabilities.
///
/// Coordinates are produced by the device sensor, by forward-geocoding a free-text
/// query or postal code, or by a manual map-pin placement. A new coordinate always
/// supersedes the previous one; no history is kept.
///
/// # Examples
///
/// ```
/// use servicearea::Coordinate;
///
/// let delhi = Coordinate::new(28.6139, 77.2090);
/// assert_eq!(delhi.latitude, 28.6139);
/// assert_eq!(delhi.to_string(), "28.6139, 77.2090");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Constructs a new coordinate from decimal degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Calculates the great-circle distance to another coordinate using the haversine formula.
    ///
    /// Returns the distance in kilometers, assuming a spherical Earth with radius
    /// [`EARTH_RADIUS_KM`]. The result is symmetric: `a.distance_to(&b) == b.distance_to(&a)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use servicearea::Coordinate;
    ///
    /// let mumbai = Coordinate::new(19.0968, 72.8517);
    /// let pune = Coordinate::new(18.5204, 73.8567);
    ///
    /// let distance = mumbai.distance_to(&pune);
    /// assert!(distance > 110.0 && distance < 135.0);
    /// ```
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// The area in which service is provided: a reference point and a radius around it.
///
/// The reference point is established once per process by forward-geocoding the
/// configured postal code (see [`LocationResolver::service_area`]).
///
/// [`LocationResolver::service_area`]: crate::LocationResolver::service_area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    /// Center of the service area
    pub reference: Coordinate,
    /// Radius in kilometers around the reference point
    pub radius_km: f64,
}

impl ServiceArea {
    /// Constructs a service area from a reference point and radius.
    pub fn new(reference: Coordinate, radius_km: f64) -> Self {
        Self {
            reference,
            radius_km,
        }
    }

    /// Returns whether the coordinate lies within the radius (boundary inclusive).
    ///
    /// # Examples
    ///
    /// ```
    /// use servicearea::{Coordinate, ServiceArea};
    ///
    /// let area = ServiceArea::new(Coordinate::new(19.0968, 72.8517), 10.0);
    ///
    /// assert!(area.contains(&Coordinate::new(19.0968, 72.8517)));
    /// assert!(!area.contains(&Coordinate::new(19.5, 73.3)));
    /// ```
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.distance_to(&self.reference) <= self.radius_km
    }
}

/// Pure serviceability check: is `coordinate` within `area`?
///
/// Same as [`ServiceArea::contains`].
pub fn compute_serviceability(coordinate: &Coordinate, area: &ServiceArea) -> bool {
    area.contains(coordinate)
}

/// A coordinate together with everything derived from it.
///
/// Recomputed whenever the current coordinate changes and never persisted.
/// `is_serviceable` is only ever produced from the coordinate itself, through
/// [`ResolvedLocation::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// The resolved point
    pub coordinate: Coordinate,
    /// First formatted address the geocoder returned, if any
    pub formatted_address: Option<String>,
    /// Whether the point lies within the service area
    pub is_serviceable: bool,
}

impl ResolvedLocation {
    /// Derives a resolved location from a coordinate and an optional service area.
    ///
    /// Without a service area the check is disabled and the location counts as serviceable.
    pub fn new(
        coordinate: Coordinate,
        formatted_address: Option<String>,
        area: Option<&ServiceArea>,
    ) -> Self {
        let is_serviceable = area.map_or(true, |area| area.contains(&coordinate));
        Self {
            coordinate,
            formatted_address,
            is_serviceable,
        }
    }

    /// Human-readable label: the formatted address, or the raw coordinates as a fallback.
    pub fn label(&self) -> String {
        self.formatted_address
            .clone()
            .unwrap_or_else(|| self.coordinate.to_string())
    }
}

/// Location permission as reported by the platform permission subsystem.
///
/// Transitions: `Unknown -> Granted | Denied`, `Denied -> Granted` through a fresh
/// request. There is no transition back to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Not yet decided, or the platform cannot tell
    #[default]
    Unknown,
    /// The user refused location access
    Denied,
    /// The user allowed location access
    Granted,
}

impl PermissionState {
    /// Whether location access is granted.
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }

    /// Applies a freshly observed state.
    ///
    /// Never moves back to `Unknown`. Leaving `Denied` for `Granted` takes an
    /// explicit request; a passive check cannot do it.
    pub(crate) fn transition(self, observed: PermissionState, requested: bool) -> PermissionState {
        match (self, observed) {
            (current, PermissionState::Unknown) => current,
            (PermissionState::Denied, PermissionState::Granted) if !requested => {
                PermissionState::Denied
            }
            (_, decided) => decided,
        }
    }
}
