use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

use super::{AsyncKeyValueStore, KeyValueStore};

/// Extension for per-key files
const FILE_EXTENSION: &str = "json";

/// Every record file starts with this, so no key maps to a dotfile
const FILE_PREFIX: &str = "k-";

/// Longest encoded key used verbatim in a file name.
/// Most filesystems cap a name at 255 bytes.
const MAX_ENCODED_KEY_LEN: usize = 200;

/// Encoded bytes kept ahead of the hash when a key is too long
const HASHED_PREFIX_LEN: usize = 64;

/// On-disk record. The key is kept so long (hashed) names can be listed.
#[derive(Serialize, Deserialize)]
struct FileRecord<S> {
    key: S,
    raw: S,
}

/// Persistent store keeping one file per key under a directory.
///
/// Any string is a valid key. Writes go to a temporary file that is then
/// renamed over the record, so readers never see a partial value.
pub struct FileStore {
    dir: PathBuf,
    max_value_bytes: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_value_bytes: None,
        })
    }

    /// Reject values larger than `limit` bytes
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = Some(limit);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for path in self.record_files()? {
            let record = std::fs::read_to_string(&path)
                .ok()
                .and_then(|contents| serde_json::from_str::<FileRecord<String>>(&contents).ok());
            match record {
                Some(record) => keys.push(record.key),
                None => debug!(file = %path.display(), "Skipping unreadable record"),
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Remove every record file, readable or not
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for path in self.record_files()? {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn record_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX))
                && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION);
            if is_record {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    fn check_size(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self.max_value_bytes {
            Some(limit) if value.len() > limit => Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                size: value.len(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn encode_record(&self, key: &str, value: &str) -> Result<String, StoreError> {
        self.check_size(key, value)?;
        let record = FileRecord { key, raw: value };
        serde_json::to_string(&record).map_err(|e| StoreError::Io(std::io::Error::other(e)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(contents) => decode_record(key, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let contents = self.encode_record(key, value)?;
        write_atomic(&self.dir, &self.key_path(key), &contents)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AsyncKeyValueStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(contents) => decode_record(key, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let contents = self.encode_record(key, value)?;
        let dir = self.dir.clone();
        let path = self.key_path(key);
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &contents))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Write to a temp file in `dir`, then rename it over `path`
fn write_atomic(dir: &Path, path: &Path, contents: &str) -> Result<(), StoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn decode_record(key: &str, contents: &str) -> Result<Option<String>, StoreError> {
    let record: FileRecord<String> =
        serde_json::from_str(contents).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    // A different key here means two long keys share a hashed name
    if record.key != key {
        return Ok(None);
    }
    Ok(Some(record.raw))
}

/// `k-<encoded>.json`, or `k-<encoded prefix>~<sha256>.json` for long keys
fn file_name(key: &str) -> String {
    let encoded = encode_key(key);
    let stem = if encoded.len() <= MAX_ENCODED_KEY_LEN {
        encoded
    } else {
        let digest = Sha256::digest(key.as_bytes());
        let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        // `encoded` is ASCII, so any byte index is a char boundary
        format!("{}~{}", &encoded[..HASHED_PREFIX_LEN], hash)
    };
    format!("{}{}.{}", FILE_PREFIX, stem, FILE_EXTENSION)
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Percent-encode everything outside `[A-Za-z0-9._-]`
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if is_plain(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
