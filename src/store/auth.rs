//! Authentication state, persisted across restarts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{KeyValueStore, Store, StoreError};

/// Storage key of the persisted auth state.
pub const STORAGE_KEY: &str = "auth-storage";

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
}

/// Who is using the app.
///
/// `is_authenticated` is true for a signed-in user and for a guest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Signed-in user, if any
    pub user: Option<User>,
    /// Browsing without an account
    pub is_guest: bool,
    /// Allowed past the onboarding screens
    pub is_authenticated: bool,
}

/// Store of the current [`AuthState`].
pub struct AuthStore {
    store: Store<AuthState>,
}

impl AuthStore {
    /// Auth state kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            store: Store::new(AuthState::default()),
        }
    }

    /// Auth state restored from and saved to `backend`.
    pub fn persisted(backend: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Ok(Self {
            store: Store::persisted(STORAGE_KEY, backend, AuthState::default())?,
        })
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.store.get()
    }

    /// Observe changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.store.subscribe()
    }

    /// Sign a user in, or clear the user with `None`. Leaves guest mode.
    pub fn set_user(&self, user: Option<User>) {
        tracing::info!(signed_in = user.is_some(), "auth user changed");
        self.store.update(|state| {
            state.is_authenticated = user.is_some();
            state.user = user;
            state.is_guest = false;
        });
    }

    /// Enter or leave guest mode. Clears any signed-in user.
    pub fn set_guest_mode(&self, is_guest: bool) {
        self.store.update(|state| {
            state.user = None;
            state.is_guest = is_guest;
            state.is_authenticated = is_guest;
        });
    }

    /// Forget the user and guest mode.
    pub fn logout(&self) {
        tracing::info!("logout");
        self.store.set(AuthState::default());
    }
}
