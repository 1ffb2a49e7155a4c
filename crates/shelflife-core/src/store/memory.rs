use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::StoreError;

use super::{AsyncKeyValueStore, KeyValueStore};

/// Process-local store. Contents live only as long as the value does.
///
/// An optional quota caps the total size of all keys and values in bytes,
/// the way browser storage areas do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RwLock::default(),
            quota: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, sorted
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.read()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, String>>, StoreError> {
        self.items
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, String>>, StoreError> {
        self.items
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn used_bytes(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.write()?;

        if let Some(limit) = self.quota {
            let replaced = items.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let size = used_bytes(&items) - replaced + key.len() + value.len();
            if size > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    limit,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.write()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl AsyncKeyValueStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        KeyValueStore::get(self, key)
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        KeyValueStore::set(self, key, value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        KeyValueStore::remove(self, key)
    }
}
