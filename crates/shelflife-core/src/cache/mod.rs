//! JSON caching over key-value stores.
//!
//! This module provides:
//! - `ExpiringStore`: values with a time-to-live, purged lazily on read
//! - `Entry`: the persisted `{value, expires}` record
//! - `json`: plain JSON get/set/remove helpers without expiry
//!
//! Entries are considered valid for 60 minutes unless a TTL is given.

pub mod entry;
pub mod expiring;
pub mod json;

pub use entry::Entry;
pub use expiring::{ExpiringStore, Lookup, DEFAULT_TTL_MINUTES};
pub use json::{get_item, remove_item, set_item, try_get_item, try_set_item};
