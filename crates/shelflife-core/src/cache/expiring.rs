use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StorageError;
use crate::store::{AsyncKeyValueStore, KeyValueStore};

use super::Entry;

/// TTL used by `put` and by callers with no better idea.
pub const DEFAULT_TTL_MINUTES: f64 = 60.0;

/// Outcome of reading an expiring entry.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Present and not yet expired
    Fresh(T),
    /// Nothing stored under the key
    Missing,
    /// Present but past its expiry; a removal was issued
    Expired,
    /// Present but not an expiring entry (no numeric `expires`); left alone
    Malformed,
    /// The store or the payload could not be read
    Failed(StorageError),
}

impl<T> Lookup<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }

    /// Short state name for display
    pub fn state(&self) -> &'static str {
        match self {
            Lookup::Fresh(_) => "fresh",
            Lookup::Missing => "missing",
            Lookup::Expired => "expired",
            Lookup::Malformed => "malformed",
            Lookup::Failed(_) => "failed",
        }
    }
}

/// Time-to-live semantics over any key-value store.
///
/// The store is passed to every call; `ExpiringStore` itself only carries
/// a clock and a default TTL. Expired entries are purged lazily, by the
/// first read that sees them. Every failure is absorbed: reads fall back to
/// a default, writes report `false`, removals are best-effort. The `lookup`
/// and `try_write` forms expose the reason instead.
#[derive(Debug, Clone)]
pub struct ExpiringStore<C = SystemClock> {
    clock: C,
    default_ttl_minutes: f64,
}

impl ExpiringStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ExpiringStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ExpiringStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }

    pub fn with_default_ttl(mut self, ttl_minutes: f64) -> Self {
        self.default_ttl_minutes = ttl_minutes;
        self
    }

    pub fn default_ttl_minutes(&self) -> f64 {
        self.default_ttl_minutes
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Pair `value` with an expiry `ttl_minutes` from now. No side effects.
    pub fn wrap<T>(&self, value: T, ttl_minutes: f64) -> Entry<T> {
        Entry::expiring_in(value, ttl_minutes, self.clock.now_millis())
    }

    // ===== Sync =====

    pub fn lookup<T, S>(&self, store: &S, key: &str) -> Lookup<T>
    where
        T: DeserializeOwned,
        S: KeyValueStore + ?Sized,
    {
        let lookup = match store.get(key) {
            Ok(raw) => classify(raw, self.clock.now_millis()),
            Err(e) => Lookup::Failed(e.into()),
        };
        log_lookup(key, &lookup);
        if matches!(lookup, Lookup::Expired) {
            self.remove(store, key);
        }
        lookup
    }

    /// Fresh value under `key`, or `default` for anything else
    pub fn read<T, S>(&self, store: &S, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
        S: KeyValueStore + ?Sized,
    {
        self.lookup(store, key).unwrap_or(default)
    }

    pub fn get<T, S>(&self, store: &S, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
        S: KeyValueStore + ?Sized,
    {
        self.lookup(store, key).into_option()
    }

    pub fn try_write<T, S>(
        &self,
        store: &S,
        key: &str,
        value: &T,
        ttl_minutes: f64,
    ) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        let text = serde_json::to_string(&self.wrap(value, ttl_minutes))?;
        store.set(key, &text)?;
        Ok(())
    }

    /// Store `value` under `key` for `ttl_minutes`. Returns false on failure.
    pub fn write<T, S>(&self, store: &S, key: &str, value: &T, ttl_minutes: f64) -> bool
    where
        T: Serialize + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        report_write(key, self.try_write(store, key, value, ttl_minutes))
    }

    /// `write` with the default TTL
    pub fn put<T, S>(&self, store: &S, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized,
        S: KeyValueStore + ?Sized,
    {
        self.write(store, key, value, self.default_ttl_minutes)
    }

    pub fn remove<S: KeyValueStore + ?Sized>(&self, store: &S, key: &str) {
        if let Err(e) = store.remove(key) {
            warn!(key = %key, error = %e, "Failed to remove entry");
        }
    }

    // ===== Async =====

    pub async fn lookup_async<T, S>(&self, store: &S, key: &str) -> Lookup<T>
    where
        T: DeserializeOwned,
        S: AsyncKeyValueStore + ?Sized,
    {
        let lookup = match store.load(key).await {
            Ok(raw) => classify(raw, self.clock.now_millis()),
            Err(e) => Lookup::Failed(e.into()),
        };
        log_lookup(key, &lookup);
        if matches!(lookup, Lookup::Expired) {
            self.remove_async(store, key).await;
        }
        lookup
    }

    pub async fn read_async<T, S>(&self, store: &S, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
        S: AsyncKeyValueStore + ?Sized,
    {
        self.lookup_async(store, key).await.unwrap_or(default)
    }

    pub async fn get_async<T, S>(&self, store: &S, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
        S: AsyncKeyValueStore + ?Sized,
    {
        self.lookup_async(store, key).await.into_option()
    }

    pub async fn try_write_async<T, S>(
        &self,
        store: &S,
        key: &str,
        value: &T,
        ttl_minutes: f64,
    ) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
        S: AsyncKeyValueStore + ?Sized,
    {
        let text = serde_json::to_string(&self.wrap(value, ttl_minutes))?;
        store.save(key, &text).await?;
        Ok(())
    }

    pub async fn write_async<T, S>(&self, store: &S, key: &str, value: &T, ttl_minutes: f64) -> bool
    where
        T: Serialize + ?Sized,
        S: AsyncKeyValueStore + ?Sized,
    {
        report_write(key, self.try_write_async(store, key, value, ttl_minutes).await)
    }

    pub async fn remove_async<S: AsyncKeyValueStore + ?Sized>(&self, store: &S, key: &str) {
        if let Err(e) = store.delete(key).await {
            warn!(key = %key, error = %e, "Failed to remove entry");
        }
    }
}

/// Decide what a raw stored value means at `now_millis`. Never touches the store.
fn classify<T: DeserializeOwned>(raw: Option<String>, now_millis: i64) -> Lookup<T> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Lookup::Missing,
    };

    let entry = match Entry::<Value>::parse(&raw) {
        Ok(Some(entry)) => entry,
        Ok(None) => return Lookup::Malformed,
        Err(e) => return Lookup::Failed(e.into()),
    };

    if entry.is_expired_at(now_millis) {
        return Lookup::Expired;
    }

    match serde_json::from_value(entry.value) {
        Ok(value) => Lookup::Fresh(value),
        Err(e) => Lookup::Failed(e.into()),
    }
}

fn log_lookup<T>(key: &str, lookup: &Lookup<T>) {
    match lookup {
        Lookup::Failed(e) => warn!(key = %key, error = %e, "Failed to read expiring entry"),
        Lookup::Malformed => debug!(key = %key, "Ignoring entry without expiry"),
        Lookup::Expired => debug!(key = %key, "Entry expired, purging"),
        Lookup::Fresh(_) | Lookup::Missing => {}
    }
}

fn report_write(key: &str, result: Result<(), StorageError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to write expiring entry");
            false
        }
    }
}
