//! Location serviceability for a plant-care delivery app.
//!
//! `servicearea` turns "where is the user" into "can we serve them". It mediates
//! between a platform permission subsystem, a position sensor and a remote
//! geocoding service, and answers three questions for every coordinate:
//!
//! - Which human-readable address is this?
//! - How far is it from the service area's reference point?
//! - Is it inside the service radius?
//!
//! # Features
//!
//! - **Single source of truth** - One [`LocationResolver`] holds the current coordinate,
//!   permission state and resolved address, observable through a `watch` channel
//! - **Permission-aware** - Sensor reads are gated on the platform permission, which is
//!   requested on demand and tracked as [`PermissionState`]
//! - **Geocoding** - Forward (address or postal code) and reverse (coordinate) lookups
//!   through any [`Geocoder`]; [`HttpGeocoder`] speaks the Google Geocoding API
//! - **Serviceability** - Great-circle distance against a radius around a reference
//!   postal code, resolved once and cached for the process
//! - **Cancellation** - Pending requests stop publishing once the owner goes away
//! - **Client state** - Observable stores for session, cart, credits and saved cards,
//!   optionally mirrored to disk
//!
//! # Quick Start
//!
//! Pure distance and serviceability checks need no runtime:
//!
//! ```
//! use servicearea::{compute_serviceability, Coordinate, ServiceArea};
//!
//! let sion = Coordinate::new(19.0390, 72.8619);
//! let area = ServiceArea::new(sion, 10.0);
//!
//! let dadar = Coordinate::new(19.0178, 72.8478);
//! let pune = Coordinate::new(18.5204, 73.8567);
//!
//! assert!(compute_serviceability(&dadar, &area));
//! assert!(!compute_serviceability(&pune, &area));
//! ```
//!
//! The full flow wires a geocoder, a permission provider and a sensor into a resolver:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use servicearea::permission::StaticPermissions;
//! use servicearea::sensor::FixedSensor;
//! use servicearea::{Config, Coordinate, LocationResolver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let resolver = LocationResolver::from_config(
//!     &config,
//!     Arc::new(StaticPermissions::granting()),
//!     Arc::new(FixedSensor::new(Coordinate::new(19.0178, 72.8478))),
//! )?;
//!
//! let location = resolver.locate().await?;
//! println!("{} (serviceable: {})", location.label(), location.is_serviceable);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ## Resolution Flow
//!
//! 1. Check the location permission, requesting it if needed
//! 2. Read the current position from the sensor (bounded by a timeout, stale fixes rejected)
//! 3. Reverse-geocode the coordinate into an address
//! 4. Resolve the service area reference point (first use only) and compare distances
//! 5. Publish the [`ResolvedLocation`] if the coordinate is still the current one
//!
//! Search and map pin drops skip steps 1-2: a forward geocode or the pin itself
//! supplies the coordinate.
//!
//! ## Failure Handling
//!
//! Every failure surfaces as a [`LocationError`]. Recoverable geocoding failures are
//! retried once; everything else is recorded in the resolver state and returned to the
//! caller, which decides what to show. [`LocationError::user_message`] gives the text.
//! A service area that cannot be resolved does not block the user: locations are then
//! treated as serviceable and the lookup is retried on the next resolution.
//!
//! # Thread Safety
//!
//! [`LocationResolver`] is `Send + Sync` and meant to be shared behind an `Arc`.
//! Concurrent writers are not ordered; the last completed write wins. Observers never
//! block writers.
//!
//! # Configuration
//!
//! [`Config::from_env`] reads:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `GEOCODING_API_KEY` | required |
//! | `GEOCODING_BASE_URL` | Google Geocoding API |
//! | `GEOCODING_TIMEOUT_SECS` | 10 |
//! | `SERVICE_POSTAL_CODE` | 400022 |
//! | `SERVICE_RADIUS_KM` | 10 |
//! | `LOCATION_TIMEOUT_SECS` | 15 |
//! | `LOCATION_MAX_AGE_SECS` | 10 |
//! | `SERVICEAREA_STATE_DIR` | unset (in-memory stores) |
//!
//! # Modules
//!
//! - [`types`] - Core data structures ([`Coordinate`], [`ServiceArea`], [`ResolvedLocation`])
//! - [`resolver`] - The [`LocationResolver`] and its observable [`LocationSnapshot`]
//! - [`geocode`] - Geocoding trait and HTTP client
//! - [`permission`] - Platform permission mapping and providers
//! - [`sensor`] - Position sensor trait and fixes
//! - [`store`] - Observable client-side state
//! - [`validation`] - Login and sign-up form checks
//! - [`countdown`] - One-time code resend timer

#![warn(missing_docs)]

pub mod config;
pub mod countdown;
pub mod error;
pub mod geocode;
pub mod permission;
pub mod resolver;
pub mod sensor;
pub mod store;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::LocationError;
pub use geocode::{Geocoder, HttpGeocoder};
pub use resolver::{LocationResolver, LocationSnapshot};
pub use types::{
    compute_serviceability, Coordinate, PermissionState, ResolvedLocation, ServiceArea,
};
