//! Backing key-value stores.
//!
//! This module provides the string-keyed storage capability that expiring
//! entries are layered on:
//! - `KeyValueStore`: synchronous get/set/remove of raw text
//! - `AsyncKeyValueStore`: the same capability for stores that may suspend
//! - `MemoryStore`: process-local store, gone when the process exits
//! - `FileStore`: one JSON file per key under a directory
//!
//! `Option<S>` is itself a store: `None` stands for "no storage available
//! here" and fails every operation with `StoreError::Unavailable`.

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Message used when an `Option` store is `None`
const NO_STORE_MESSAGE: &str = "no backing store in this context";

/// A flat, string-keyed store of raw text values.
pub trait KeyValueStore {
    /// Fetch the raw value for `key`, `None` if nothing is stored
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a key that does not exist succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Non-blocking counterpart of [`KeyValueStore`].
///
/// `load`, `save` and `delete` mirror `get`, `set` and `remove`.
#[async_trait]
pub trait AsyncKeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore> KeyValueStore for Option<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Some(store) => store.get(key),
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.set(key, value),
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.remove(key),
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }
}

#[async_trait]
impl<S: AsyncKeyValueStore + ?Sized> AsyncKeyValueStore for Arc<S> {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<S: AsyncKeyValueStore> AsyncKeyValueStore for Option<S> {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Some(store) => store.load(key).await,
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.save(key, value).await,
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.delete(key).await,
            None => Err(StoreError::Unavailable(NO_STORE_MESSAGE.to_string())),
        }
    }
}
