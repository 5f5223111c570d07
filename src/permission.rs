//! Location permission capability.
//!
//! The platform permission subsystem is reached through [`PermissionProvider`]. Which
//! permission identifier applies is a static property of the build target, captured
//! by [`Platform::current`].

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LocationError;
use crate::types::PermissionState;

/// Target platform, as far as location permissions are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// iOS: when-in-use location
    Ios,
    /// Android: fine location
    Android,
    /// Anything else
    Unsupported,
}

impl Platform {
    /// The platform this binary was built for.
    pub const fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Unsupported
        }
    }

    /// Identifier of the location permission on this platform.
    pub fn location_permission(self) -> Result<&'static str, LocationError> {
        match self {
            Platform::Ios => Ok("ios.permission.LOCATION_WHEN_IN_USE"),
            Platform::Android => Ok("android.permission.ACCESS_FINE_LOCATION"),
            Platform::Unsupported => Err(LocationError::PermissionUnsupportedPlatform),
        }
    }
}

/// Check/request primitives of the platform permission subsystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current permission, without prompting.
    async fn check(&self) -> Result<PermissionState, LocationError>;

    /// Prompt the user (when the platform still allows it) and return the outcome.
    async fn request(&self) -> Result<PermissionState, LocationError>;
}

/// Permission provider with a predetermined answer to the consent prompt.
///
/// Used on hosts without a permission subsystem and by the command-line front-end,
/// where the "user" answers through a flag.
#[derive(Debug)]
pub struct StaticPermissions {
    platform: Platform,
    answer: PermissionState,
    state: Mutex<PermissionState>,
}

impl StaticPermissions {
    /// A provider that answers every prompt with `answer`.
    pub fn new(platform: Platform, answer: PermissionState) -> Self {
        Self {
            platform,
            answer,
            state: Mutex::new(PermissionState::Unknown),
        }
    }

    /// A provider that grants on request, ignoring the platform identifier.
    pub fn granting() -> Self {
        Self::new(Platform::Android, PermissionState::Granted)
    }

    /// A provider that denies on request, ignoring the platform identifier.
    pub fn denying() -> Self {
        Self::new(Platform::Android, PermissionState::Denied)
    }

    fn current(&self) -> PermissionState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn check(&self) -> Result<PermissionState, LocationError> {
        self.platform.location_permission()?;
        Ok(self.current())
    }

    async fn request(&self) -> Result<PermissionState, LocationError> {
        let permission = self.platform.location_permission()?;
        tracing::debug!(permission, answer = ?self.answer, "permission prompt");
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = self.answer;
        Ok(*state)
    }
}
