//! Observable client-side state containers.
//!
//! A [`Store`] holds one value, publishes every change to its subscribers and can
//! mirror itself as JSON into a [`KeyValueStore`] under a stable name, so that it is
//! restored on the next start.

mod backend;

pub mod auth;
pub mod cards;
pub mod cart;
pub mod credit;
pub mod home;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

pub use backend::{FileStore, MemoryStore};

/// Errors raised by key-value backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("invalid stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key is not usable as a storage name
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    /// A previous writer panicked while holding the backend lock
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Persistent string storage keyed by a stable name.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

type Persist<T> = Box<dyn Fn(&T) -> Result<(), StoreError> + Send + Sync>;

/// A shared value with publish-on-change semantics.
///
/// # Examples
///
/// ```
/// use servicearea::store::Store;
///
/// let counter = Store::new(0u32);
/// let observer = counter.subscribe();
///
/// counter.update(|value| *value += 1);
///
/// assert_eq!(counter.get(), 1);
/// assert_eq!(*observer.borrow(), 1);
/// ```
pub struct Store<T> {
    state: watch::Sender<T>,
    persist: Option<Persist<T>>,
    persisting: Mutex<()>,
}

impl<T: Clone> Store<T> {
    /// An in-memory store starting at `initial`.
    pub fn new(initial: T) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            persist: None,
            persisting: Mutex::new(()),
        }
    }

    /// Copy of the current value.
    pub fn get(&self) -> T {
        self.state.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.state.borrow())
    }

    /// Receive every future change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.state.subscribe()
    }

    /// Modify the value in place, notify subscribers and persist the result.
    ///
    /// Persistence failures are logged; the in-memory value is updated regardless.
    pub fn update(&self, modify: impl FnOnce(&mut T)) {
        self.state.send_modify(modify);
        if let Some(persist) = &self.persist {
            // Writes land in order and each one carries the latest value.
            let _writing = self.persisting.lock().unwrap_or_else(PoisonError::into_inner);
            let value = self.state.borrow().clone();
            if let Err(e) = persist(&value) {
                tracing::warn!(error = %e, "failed to persist store");
            }
        }
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }
}

impl<T: Clone + Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Store<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    /// A store mirrored into `backend` under `key`.
    ///
    /// Starts from the stored value when one exists and decodes, from `default`
    /// otherwise. A stored value that no longer decodes is discarded.
    pub fn persisted(
        key: impl Into<String>,
        backend: Arc<dyn KeyValueStore>,
        default: T,
    ) -> Result<Self, StoreError> {
        let key = key.into();

        let initial = match backend.get(&key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable stored value");
                    default
                }
            },
            None => default,
        };

        let (state, _) = watch::channel(initial);
        let persist: Persist<T> = Box::new(move |value: &T| {
            let encoded = serde_json::to_string(value)?;
            backend.set(&key, &encoded)
        });

        Ok(Self {
            state,
            persist: Some(persist),
            persisting: Mutex::new(()),
        })
    }
}
