//! Shelflife - expiring JSON entries over pluggable key-value stores.
//!
//! Values are written together with an absolute expiry time and purged
//! lazily by the first read that finds them stale. The backing store is
//! passed to every operation, so the same code runs against an in-memory
//! map, a directory of files, or any other `KeyValueStore`.
//!
//! Storage failures never reach the caller of `read`/`write`/`remove`:
//! reads fall back to a default, writes report `false`, and the reason is
//! logged through `tracing`.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod store;
pub mod utils;

pub use cache::{Entry, ExpiringStore, Lookup, DEFAULT_TTL_MINUTES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{StorageError, StoreError};
pub use store::{AsyncKeyValueStore, FileStore, KeyValueStore, MemoryStore};
