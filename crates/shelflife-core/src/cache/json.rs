//! JSON values stored without expiry.
//!
//! The fallible `try_*` functions report what went wrong; the others log the
//! failure and fall back to a default or `false`.

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::store::KeyValueStore;

pub fn try_get_item<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
        _ => Ok(None),
    }
}

/// Parsed value under `key`, or `default` if absent or unreadable
pub fn get_item<T, S>(store: &S, key: &str, default: T) -> T
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match try_get_item(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read item");
            default
        }
    }
}

pub fn try_set_item<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let text = serde_json::to_string(value)?;
    store.set(key, &text)?;
    Ok(())
}

/// Store `value` as JSON. Returns false on failure.
pub fn set_item<T, S>(store: &S, key: &str, value: &T) -> bool
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match try_set_item(store, key, value) {
        Ok(()) => true,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to save item");
            false
        }
    }
}

pub fn remove_item<S: KeyValueStore + ?Sized>(store: &S, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!(key = %key, error = %e, "Failed to remove item");
    }
}
