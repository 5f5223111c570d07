//! The location resolver: permission, sensor and geocoder mediated into one observable state.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, DEFAULT_POSTAL_CODE, DEFAULT_RADIUS_KM};
use crate::error::LocationError;
use crate::geocode::{Geocoder, HttpGeocoder};
use crate::permission::PermissionProvider;
use crate::sensor::{LocationSensor, PositionOptions};
use crate::types::{Coordinate, PermissionState, ResolvedLocation, ServiceArea};

/// Everything observers of the resolver can see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSnapshot {
    /// Last known permission state
    pub permission: PermissionState,
    /// Current coordinate, if one was ever established
    pub coordinate: Option<Coordinate>,
    /// Resolution of `coordinate`, once address and serviceability are known
    pub resolved: Option<ResolvedLocation>,
    /// A permission prompt, sensor request or resolution is in flight
    pub loading: bool,
    /// Most recent failure, cleared when a new request starts
    pub error: Option<LocationError>,
}

/// Shared, process-wide source of the current location.
///
/// Only the resolver's own methods write the current coordinate and permission
/// state; screens observe them through [`subscribe`](Self::subscribe) or
/// [`snapshot`](Self::snapshot). Concurrent writers are not ordered: the last
/// completed write wins.
///
/// Every public operation runs under the cancellation token current when it
/// started. [`cancel`](Self::cancel) stops those operations and hands later ones
/// a fresh token, so the resolver stays usable after a screen goes away.
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    permissions: Arc<dyn PermissionProvider>,
    sensor: Arc<dyn LocationSensor>,
    postal_code: String,
    radius_km: f64,
    position: PositionOptions,
    area: OnceCell<ServiceArea>,
    state: watch::Sender<LocationSnapshot>,
    cancel: Mutex<CancellationToken>,
}

impl LocationResolver {
    /// Create a resolver with the default service area query and sensor options.
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        permissions: Arc<dyn PermissionProvider>,
        sensor: Arc<dyn LocationSensor>,
    ) -> Self {
        let (state, _) = watch::channel(LocationSnapshot::default());
        Self {
            geocoder,
            permissions,
            sensor,
            postal_code: DEFAULT_POSTAL_CODE.to_string(),
            radius_km: DEFAULT_RADIUS_KM,
            position: PositionOptions::default(),
            area: OnceCell::new(),
            state,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a resolver talking to the configured HTTP geocoder.
    pub fn from_config(
        config: &Config,
        permissions: Arc<dyn PermissionProvider>,
        sensor: Arc<dyn LocationSensor>,
    ) -> Result<Self, LocationError> {
        let geocoder = Arc::new(HttpGeocoder::new(&config.geocoding)?);
        Ok(Self::new(geocoder, permissions, sensor)
            .with_service_area_query(config.postal_code.clone(), config.radius_km)
            .with_position_options(config.position))
    }

    /// Anchor the service area on `postal_code`, resolved lazily on first use.
    pub fn with_service_area_query(
        mut self,
        postal_code: impl Into<String>,
        radius_km: f64,
    ) -> Self {
        self.postal_code = postal_code.into();
        self.radius_km = radius_km;
        self.area = OnceCell::new();
        self
    }

    /// Use an already known service area instead of geocoding the postal code.
    pub fn with_service_area(mut self, area: ServiceArea) -> Self {
        self.radius_km = area.radius_km;
        self.area = OnceCell::new_with(Some(area));
        self
    }

    /// Override the sensor options.
    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.position = options;
        self
    }

    /// Observe every state change.
    pub fn subscribe(&self) -> watch::Receiver<LocationSnapshot> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LocationSnapshot {
        self.state.borrow().clone()
    }

    /// Last known permission state.
    pub fn permission(&self) -> PermissionState {
        self.state.borrow().permission
    }

    /// Current coordinate, if any.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.state.borrow().coordinate
    }

    /// Cancel every request started so far.
    ///
    /// Call when an observer goes away (screen unmount, navigation away). Cancelled
    /// requests return [`LocationError::Cancelled`] and publish nothing; requests
    /// started afterwards run normally.
    pub fn cancel(&self) {
        tracing::debug!("location requests cancelled");
        {
            let mut current = self.lock_token();
            current.cancel();
            *current = CancellationToken::new();
        }
        self.state.send_modify(|state| state.loading = false);
    }

    /// Token cancelled by the next [`cancel`](Self::cancel), for tasks tied to the
    /// requests in flight now.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.lock_token().child_token()
    }

    /// Query the permission without prompting. Never fails.
    ///
    /// A check can record a first decision or a revocation, but never lifts a denial;
    /// that takes [`request_permission`](Self::request_permission).
    pub async fn check_permission(&self) -> PermissionState {
        let token = self.request_token();
        let current = self.permission();
        let observed = match self.cancellable(&token, self.permissions.check()).await {
            Ok(observed) => observed,
            Err(e) => {
                tracing::warn!(error = %e, "permission check failed");
                PermissionState::Unknown
            }
        };

        let next = current.transition(observed, false);
        self.publish(&token, |state| state.permission = next);
        next
    }

    /// Prompt for permission unless it is already granted.
    ///
    /// Returns `true` iff the resulting state is [`PermissionState::Granted`].
    pub async fn request_permission(&self) -> bool {
        let token = self.request_token();
        self.request_permission_with(&token).await
    }

    /// Fetch the device position and make it the current coordinate.
    ///
    /// Prompts first when permission is not granted and fails with
    /// [`LocationError::PermissionDenied`] without touching the sensor when refused.
    /// A failed fetch leaves the previous coordinate in place.
    pub async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        let token = self.request_token();
        self.current_coordinate_with(&token).await
    }

    /// First formatted address for `coordinate`, as a typed result.
    pub async fn try_reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<String, LocationError> {
        let token = self.request_token();
        self.try_reverse_with(&token, coordinate).await
    }

    /// First formatted address for `coordinate`, or `None` on no result or failure.
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String> {
        let token = self.request_token();
        self.reverse_address(&token, coordinate).await
    }

    /// Coordinate of the first match for `query`, as a typed result.
    pub async fn try_forward_geocode(&self, query: &str) -> Result<Coordinate, LocationError> {
        let token = self.request_token();
        self.try_forward_with(&token, query).await
    }

    /// Coordinate of the first match for `query`, or `None` on no result or failure.
    pub async fn forward_geocode(&self, query: &str) -> Option<Coordinate> {
        match self.try_forward_geocode(query).await {
            Ok(coordinate) => Some(coordinate),
            Err(e) => {
                tracing::warn!(query, error = %e, "forward geocoding failed");
                None
            }
        }
    }

    /// Pure serviceability check against an explicit area.
    pub fn compute_serviceability(&self, coordinate: &Coordinate, area: &ServiceArea) -> bool {
        crate::types::compute_serviceability(coordinate, area)
    }

    /// The service area, geocoding the reference postal code on first use.
    ///
    /// A successful lookup is kept for the lifetime of the resolver; a failed one is
    /// reported and attempted again on the next call.
    pub async fn service_area(&self) -> Result<ServiceArea, LocationError> {
        let token = self.request_token();
        self.service_area_with(&token).await
    }

    /// Make `coordinate` current and derive its address and serviceability.
    ///
    /// Geocoding failures degrade: the address is left empty, and when the service
    /// area cannot be established the location counts as serviceable. Cancellation
    /// does not degrade; it fails with [`LocationError::Cancelled`].
    pub async fn resolve(&self, coordinate: Coordinate) -> Result<ResolvedLocation, LocationError> {
        let token = self.request_token();
        self.resolve_with(&token, coordinate).await
    }

    /// "Use current location": fetch the device position and resolve it.
    pub async fn locate(&self) -> Result<ResolvedLocation, LocationError> {
        let token = self.request_token();
        let coordinate = self.current_coordinate_with(&token).await?;
        self.resolve_with(&token, coordinate).await
    }

    /// Manual search by free text or postal code.
    ///
    /// Fails with [`LocationError::GeocodeNoResult`] when nothing matches, leaving the
    /// current coordinate untouched.
    pub async fn search(&self, query: &str) -> Result<ResolvedLocation, LocationError> {
        let token = self.request_token();
        match self.try_forward_with(&token, query).await {
            Ok(coordinate) => self.resolve_with(&token, coordinate).await,
            Err(e) => {
                tracing::info!(query, error = %e, "search found no location");
                self.publish(&token, |state| state.error = Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Manual map-pin placement.
    pub async fn drop_pin(
        &self,
        coordinate: Coordinate,
    ) -> Result<ResolvedLocation, LocationError> {
        self.resolve(coordinate).await
    }

    async fn request_permission_with(&self, token: &CancellationToken) -> bool {
        let current = self.permission();
        if current.is_granted() {
            return true;
        }

        self.publish(token, |state| {
            state.loading = true;
            state.error = None;
        });

        match self.cancellable(token, self.permissions.request()).await {
            Ok(observed) => {
                let next = current.transition(observed, true);
                tracing::info!(permission = ?next, "location permission requested");
                self.publish(token, |state| {
                    state.permission = next;
                    state.loading = false;
                });
                next.is_granted()
            }
            Err(e) => {
                tracing::warn!(error = %e, "permission request failed");
                self.publish(token, |state| {
                    state.loading = false;
                    state.error = Some(e);
                });
                false
            }
        }
    }

    async fn current_coordinate_with(
        &self,
        token: &CancellationToken,
    ) -> Result<Coordinate, LocationError> {
        if !self.request_permission_with(token).await {
            let err = if token.is_cancelled() {
                LocationError::Cancelled
            } else {
                // A failed prompt (e.g. unsupported platform) already recorded its cause.
                self.state
                    .borrow()
                    .error
                    .clone()
                    .unwrap_or(LocationError::PermissionDenied)
            };
            self.publish(token, |state| state.error = Some(err.clone()));
            return Err(err);
        }

        self.publish(token, |state| {
            state.loading = true;
            state.error = None;
        });

        match self.cancellable(token, self.fetch_position()).await {
            Ok(coordinate) => {
                tracing::info!(
                    lat = coordinate.latitude,
                    lng = coordinate.longitude,
                    "current location updated"
                );
                self.publish(token, |state| {
                    state.coordinate = Some(coordinate);
                    state.loading = false;
                });
                Ok(coordinate)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to get current location");
                self.publish(token, |state| {
                    if e == LocationError::PermissionDenied {
                        state.permission = PermissionState::Denied;
                    }
                    state.loading = false;
                    state.error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    async fn try_reverse_with(
        &self,
        token: &CancellationToken,
        coordinate: Coordinate,
    ) -> Result<String, LocationError> {
        tracing::debug!(
            lat = coordinate.latitude,
            lng = coordinate.longitude,
            "reverse geocoding"
        );
        self.cancellable(token, self.geocoder.reverse(coordinate))
            .await?
            .into_iter()
            .next()
            .map(|result| result.formatted_address)
            .ok_or_else(|| LocationError::GeocodeNoResult(coordinate.to_string()))
    }

    async fn reverse_address(
        &self,
        token: &CancellationToken,
        coordinate: Coordinate,
    ) -> Option<String> {
        match self.try_reverse_with(token, coordinate).await {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!(error = %e, "reverse geocoding failed, falling back to coordinates");
                None
            }
        }
    }

    async fn try_forward_with(
        &self,
        token: &CancellationToken,
        query: &str,
    ) -> Result<Coordinate, LocationError> {
        tracing::debug!(query, "forward geocoding");
        self.cancellable(token, self.geocoder.forward(query))
            .await?
            .first()
            .map(|result| result.coordinate())
            .ok_or_else(|| LocationError::GeocodeNoResult(query.to_string()))
    }

    async fn service_area_with(
        &self,
        token: &CancellationToken,
    ) -> Result<ServiceArea, LocationError> {
        self.area
            .get_or_try_init(|| async {
                let reference = self.try_forward_with(token, &self.postal_code).await?;
                tracing::info!(
                    postal_code = %self.postal_code,
                    lat = reference.latitude,
                    lng = reference.longitude,
                    radius_km = self.radius_km,
                    "service area established"
                );
                Ok::<_, LocationError>(ServiceArea::new(reference, self.radius_km))
            })
            .await
            .copied()
    }

    async fn resolve_with(
        &self,
        token: &CancellationToken,
        coordinate: Coordinate,
    ) -> Result<ResolvedLocation, LocationError> {
        self.publish(token, |state| {
            state.coordinate = Some(coordinate);
            state.loading = true;
            state.error = None;
        });

        let (address, area) = tokio::join!(
            self.reverse_address(token, coordinate),
            self.service_area_with(token)
        );
        if token.is_cancelled() {
            return Err(LocationError::Cancelled);
        }
        let area = match area {
            Ok(area) => Some(area),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "service area unavailable, serviceability check disabled"
                );
                None
            }
        };

        let resolved = ResolvedLocation::new(coordinate, address, area.as_ref());
        tracing::info!(
            lat = coordinate.latitude,
            lng = coordinate.longitude,
            serviceable = resolved.is_serviceable,
            "location resolved"
        );

        let published = resolved.clone();
        self.publish(token, move |state| {
            // A newer coordinate may have arrived while this one was resolving.
            if state.coordinate == Some(coordinate) {
                state.resolved = Some(published);
                state.loading = false;
            }
        });
        Ok(resolved)
    }

    async fn fetch_position(&self) -> Result<Coordinate, LocationError> {
        let options = self.position;
        let read = self.sensor.current_fix(options);
        let fix = match tokio::time::timeout(options.timeout, read).await {
            Ok(result) => result?,
            Err(_) => return Err(LocationError::LocationTimeout),
        };
        if !fix.is_fresh(options.maximum_age, Utc::now()) {
            return Err(LocationError::LocationUnavailable(format!(
                "fix from {} is older than {}s",
                fix.timestamp,
                options.maximum_age.as_secs()
            )));
        }
        Ok(fix.coordinate)
    }

    async fn cancellable<T, F>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<T, LocationError>
    where
        F: Future<Output = Result<T, LocationError>>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(LocationError::Cancelled),
            result = operation => result,
        }
    }

    fn publish(&self, token: &CancellationToken, modify: impl FnOnce(&mut LocationSnapshot)) {
        if token.is_cancelled() {
            return;
        }
        self.state.send_modify(modify);
    }

    fn request_token(&self) -> CancellationToken {
        self.lock_token().clone()
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        match self.cancel.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{GeocodeResult, MockGeocoder};
    use crate::permission::MockPermissionProvider;
    use crate::sensor::{Fix, MockLocationSensor, SensorError};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn mumbai_area() -> ServiceArea {
        ServiceArea::new(Coordinate::new(19.0968, 72.8517), 10.0)
    }

    /// Geocoder answering from a fixed table of known places.
    struct FixtureGeocoder {
        places: Vec<GeocodeResult>,
    }

    impl FixtureGeocoder {
        fn new() -> Self {
            Self {
                places: vec![
                    GeocodeResult::new(
                        "Dadar East, Mumbai, Maharashtra 400014, India",
                        Coordinate::new(19.0178, 72.8478),
                    ),
                    GeocodeResult::new(
                        "Sion, Mumbai, Maharashtra 400022, India",
                        Coordinate::new(19.0390, 72.8619),
                    ),
                    GeocodeResult::new(
                        "Connaught Place, New Delhi, Delhi 110001, India",
                        Coordinate::new(28.6139, 77.2090),
                    ),
                ],
            }
        }
    }

    #[async_trait]
    impl Geocoder for FixtureGeocoder {
        async fn reverse(
            &self,
            coordinate: Coordinate,
        ) -> Result<Vec<GeocodeResult>, LocationError> {
            let nearest = self.places.iter().min_by(|a, b| {
                a.coordinate()
                    .distance_to(&coordinate)
                    .total_cmp(&b.coordinate().distance_to(&coordinate))
            });
            Ok(nearest.into_iter().cloned().collect())
        }

        async fn forward(&self, query: &str) -> Result<Vec<GeocodeResult>, LocationError> {
            Ok(self
                .places
                .iter()
                .filter(|place| place.formatted_address.contains(query))
                .cloned()
                .collect())
        }
    }

    /// Sensor that never answers.
    struct StalledSensor;

    #[async_trait]
    impl LocationSensor for StalledSensor {
        async fn current_fix(&self, _options: PositionOptions) -> Result<Fix, SensorError> {
            std::future::pending().await
        }
    }

    /// Geocoder that holds reverse lookups of one coordinate until released.
    struct GatedGeocoder {
        gate: Arc<Notify>,
        gated: Coordinate,
    }

    #[async_trait]
    impl Geocoder for GatedGeocoder {
        async fn reverse(
            &self,
            coordinate: Coordinate,
        ) -> Result<Vec<GeocodeResult>, LocationError> {
            if coordinate == self.gated {
                self.gate.notified().await;
            }
            Ok(vec![GeocodeResult::new(coordinate.to_string(), coordinate)])
        }

        async fn forward(&self, _query: &str) -> Result<Vec<GeocodeResult>, LocationError> {
            Ok(vec![])
        }
    }

    /// Geocoder whose forward lookups never answer.
    struct StalledForwardGeocoder;

    #[async_trait]
    impl Geocoder for StalledForwardGeocoder {
        async fn reverse(
            &self,
            _coordinate: Coordinate,
        ) -> Result<Vec<GeocodeResult>, LocationError> {
            Ok(vec![])
        }

        async fn forward(&self, _query: &str) -> Result<Vec<GeocodeResult>, LocationError> {
            std::future::pending().await
        }
    }

    fn granted_permissions() -> MockPermissionProvider {
        let mut permissions = MockPermissionProvider::new();
        permissions
            .expect_request()
            .times(1)
            .returning(|| Ok(PermissionState::Granted));
        permissions
    }

    #[tokio::test]
    async fn request_when_granted_does_not_prompt() {
        let mut permissions = MockPermissionProvider::new();
        permissions
            .expect_check()
            .returning(|| Ok(PermissionState::Granted));
        permissions.expect_request().never();

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(permissions),
            Arc::new(MockLocationSensor::new()),
        );

        assert_eq!(resolver.check_permission().await, PermissionState::Granted);
        assert!(resolver.request_permission().await);
        assert!(resolver.request_permission().await);
    }

    #[tokio::test]
    async fn check_failure_yields_unknown() {
        let mut permissions = MockPermissionProvider::new();
        permissions
            .expect_check()
            .returning(|| Err(LocationError::PermissionUnsupportedPlatform));

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(permissions),
            Arc::new(MockLocationSensor::new()),
        );

        assert_eq!(resolver.check_permission().await, PermissionState::Unknown);
    }

    #[tokio::test]
    async fn denied_permission_never_reaches_sensor() {
        let mut permissions = MockPermissionProvider::new();
        permissions
            .expect_request()
            .times(1)
            .returning(|| Ok(PermissionState::Denied));
        let mut sensor = MockLocationSensor::new();
        sensor.expect_current_fix().never();

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(permissions),
            Arc::new(sensor),
        );

        assert_eq!(
            resolver.current_coordinate().await,
            Err(LocationError::PermissionDenied)
        );
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.permission, PermissionState::Denied);
        assert_eq!(snapshot.coordinate, None);
        assert_eq!(snapshot.error, Some(LocationError::PermissionDenied));
    }

    #[tokio::test]
    async fn sensor_fix_becomes_current_and_is_reverse_geocoded() {
        let delhi = Coordinate::new(28.6139, 77.2090);

        let mut sensor = MockLocationSensor::new();
        sensor
            .expect_current_fix()
            .times(1)
            .returning(move |_| Ok(Fix::now(delhi)));

        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse()
            .withf(move |coordinate| *coordinate == delhi)
            .times(1)
            .returning(move |coordinate| {
                Ok(vec![GeocodeResult::new("Connaught Place, New Delhi", coordinate)])
            });

        let resolver = LocationResolver::new(
            Arc::new(geocoder),
            Arc::new(granted_permissions()),
            Arc::new(sensor),
        )
        .with_service_area(mumbai_area());

        let resolved = resolver.locate().await.unwrap();

        assert_eq!(resolver.coordinate(), Some(delhi));
        assert_eq!(
            resolved.formatted_address.as_deref(),
            Some("Connaught Place, New Delhi")
        );
        assert!(!resolved.is_serviceable);
        assert_eq!(resolver.snapshot().resolved, Some(resolved));
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_timeout_preserves_previous_coordinate() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(granted_permissions()),
            Arc::new(StalledSensor),
        )
        .with_service_area(mumbai_area())
        .with_position_options(PositionOptions {
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(10),
        });

        let pin = Coordinate::new(19.0390, 72.8619);
        resolver.drop_pin(pin).await.unwrap();

        assert_eq!(
            resolver.current_coordinate().await,
            Err(LocationError::LocationTimeout)
        );
        assert_eq!(resolver.coordinate(), Some(pin));
        assert!(!resolver.snapshot().loading);
    }

    #[tokio::test]
    async fn stale_fix_is_rejected() {
        let mut sensor = MockLocationSensor::new();
        sensor.expect_current_fix().returning(|_| {
            Ok(Fix {
                coordinate: Coordinate::new(1.0, 1.0),
                timestamp: Utc::now() - chrono::TimeDelta::minutes(5),
            })
        });

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(granted_permissions()),
            Arc::new(sensor),
        );

        assert!(matches!(
            resolver.current_coordinate().await,
            Err(LocationError::LocationUnavailable(_))
        ));
        assert_eq!(resolver.coordinate(), None);
    }

    #[tokio::test]
    async fn sensor_permission_error_marks_denied() {
        let mut sensor = MockLocationSensor::new();
        sensor
            .expect_current_fix()
            .returning(|_| Err(SensorError::PermissionDenied));

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(granted_permissions()),
            Arc::new(sensor),
        );

        assert_eq!(
            resolver.current_coordinate().await,
            Err(LocationError::PermissionDenied)
        );
        assert_eq!(resolver.permission(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn empty_search_leaves_coordinate_untouched() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_forward()
            .withf(|query| query.to_string() == "000000")
            .returning(|_| Ok(vec![]));
        geocoder
            .expect_reverse()
            .returning(|coordinate| Ok(vec![GeocodeResult::new("Sion, Mumbai", coordinate)]));

        let resolver = LocationResolver::new(
            Arc::new(geocoder),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area(mumbai_area());

        let pin = Coordinate::new(19.0390, 72.8619);
        resolver.drop_pin(pin).await.unwrap();

        assert_eq!(resolver.forward_geocode("000000").await, None);
        let err = resolver.search("000000").await.unwrap_err();
        assert_eq!(err, LocationError::GeocodeNoResult("000000".to_string()));
        assert_eq!(err.user_message(), "No location found for this postal code.");
        assert_eq!(resolver.coordinate(), Some(pin));
    }

    #[tokio::test]
    async fn reverse_then_forward_round_trips() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        );

        let original = Coordinate::new(19.0178, 72.8478);
        let address = resolver.reverse_geocode(original).await.unwrap();
        let back = resolver.forward_geocode(&address).await.unwrap();

        assert!(original.distance_to(&back) < 0.01);
    }

    #[tokio::test]
    async fn service_area_comes_from_postal_code() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area_query("400022", 10.0);

        let area = resolver.service_area().await.unwrap();
        assert_eq!(area.reference, Coordinate::new(19.0390, 72.8619));

        let dadar = resolver.search("Dadar East").await.unwrap();
        assert!(dadar.is_serviceable);

        let delhi = resolver.search("New Delhi").await.unwrap();
        assert!(!delhi.is_serviceable);
        assert_eq!(resolver.coordinate(), Some(Coordinate::new(28.6139, 77.2090)));
    }

    #[tokio::test]
    async fn missing_service_area_defaults_to_serviceable() {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_forward().returning(|_| Ok(vec![]));
        geocoder
            .expect_reverse()
            .returning(|_| Err(LocationError::transport("HTTP 503 Service Unavailable", true)));

        let resolver = LocationResolver::new(
            Arc::new(geocoder),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        );

        let resolved = resolver
            .drop_pin(Coordinate::new(-33.8688, 151.2093))
            .await
            .unwrap();
        assert!(resolved.is_serviceable);
        assert_eq!(resolved.formatted_address, None);
        assert_eq!(resolved.label(), "-33.8688, 151.2093");
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area(mumbai_area());
        let mut updates = resolver.subscribe();

        resolver
            .drop_pin(Coordinate::new(19.0178, 72.8478))
            .await
            .unwrap();

        assert!(updates.has_changed().unwrap());
        let seen = updates.borrow_and_update().clone();
        assert!(seen.resolved.is_some_and(|resolved| resolved.is_serviceable));
    }

    #[tokio::test]
    async fn check_cannot_lift_a_denial() {
        let mut permissions = MockPermissionProvider::new();
        permissions
            .expect_request()
            .times(1)
            .returning(|| Ok(PermissionState::Denied));
        permissions
            .expect_check()
            .returning(|| Ok(PermissionState::Granted));

        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(permissions),
            Arc::new(MockLocationSensor::new()),
        );

        assert!(!resolver.request_permission().await);
        assert_eq!(resolver.check_permission().await, PermissionState::Denied);
        assert_eq!(resolver.permission(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn cancel_stops_earlier_requests_only() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area(mumbai_area());
        let token = resolver.cancellation_token();

        resolver.cancel();
        assert!(token.is_cancelled());
        assert!(!resolver.cancellation_token().is_cancelled());

        let dadar = Coordinate::new(19.0178, 72.8478);
        let resolved = resolver.drop_pin(dadar).await.unwrap();
        assert!(resolved.is_serviceable);
        assert_eq!(resolver.coordinate(), Some(dadar));
        assert_eq!(resolver.snapshot().resolved, Some(resolved));
    }

    #[tokio::test]
    async fn cancel_during_sensor_request() {
        let resolver = LocationResolver::new(
            Arc::new(FixtureGeocoder::new()),
            Arc::new(granted_permissions()),
            Arc::new(StalledSensor),
        )
        .with_service_area(mumbai_area());

        let (located, ()) = tokio::join!(resolver.locate(), async {
            tokio::task::yield_now().await;
            resolver.cancel();
        });

        assert_eq!(located, Err(LocationError::Cancelled));
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.coordinate, None);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.permission, PermissionState::Granted);
    }

    #[tokio::test]
    async fn cancelled_resolution_has_no_verdict() {
        let resolver = LocationResolver::new(
            Arc::new(StalledForwardGeocoder),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area_query("400022", 10.0);

        let sydney = Coordinate::new(-33.8688, 151.2093);
        let (resolved, ()) = tokio::join!(resolver.resolve(sydney), async {
            tokio::task::yield_now().await;
            resolver.cancel();
        });

        assert_eq!(resolved, Err(LocationError::Cancelled));
        assert_eq!(resolver.snapshot().resolved, None);
    }

    #[tokio::test]
    async fn late_resolution_does_not_overwrite_newer_coordinate() {
        let gate = Arc::new(Notify::new());
        let first = Coordinate::new(19.0178, 72.8478);
        let second = Coordinate::new(19.0390, 72.8619);

        let resolver = LocationResolver::new(
            Arc::new(GatedGeocoder {
                gate: Arc::clone(&gate),
                gated: first,
            }),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        )
        .with_service_area(mumbai_area());

        let (early, late) = tokio::join!(resolver.drop_pin(first), async {
            let late = resolver.drop_pin(second).await;
            gate.notify_one();
            late
        });

        assert_eq!(early.unwrap().coordinate, first);
        let late = late.unwrap();
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.coordinate, Some(second));
        assert_eq!(snapshot.resolved, Some(late));
    }

    #[test]
    fn serviceability_is_pure() {
        let resolver = LocationResolver::new(
            Arc::new(MockGeocoder::new()),
            Arc::new(MockPermissionProvider::new()),
            Arc::new(MockLocationSensor::new()),
        );
        let area = mumbai_area();
        assert!(resolver.compute_serviceability(&area.reference, &area));
        assert!(!resolver.compute_serviceability(&Coordinate::new(19.5, 73.3), &area));
    }
}
