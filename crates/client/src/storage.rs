//! Durable client-side key-value storage.
//!
//! The order client persists a handful of small JSON documents between runs:
//! the access token, the cart, and cached menu photo ids. Storage is a plain
//! key-value contract so tests can swap the filesystem for memory.
//!
//! # Layout
//!
//! [`FileStorage`] keeps one file per key under the configured data
//! directory:
//!
//! ```text
//! <data_dir>/
//! ├── currentAccessToken
//! ├── storedCart
//! └── menuItemPhotoIds
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys used by the client.
pub mod keys {
    /// Key for the persisted access token.
    pub const CURRENT_ACCESS_TOKEN: &str = "currentAccessToken";

    /// Key for the persisted cart. Absent when the cart is empty.
    pub const STORED_CART: &str = "storedCart";

    /// Key for the cart snapshot taken on logout.
    pub const PREV_STORED_CART: &str = "prevStoredCart";

    /// Key for cached menu photo ids.
    pub const MENU_ITEM_PHOTO_IDS: &str = "menuItemPhotoIds";
}

/// Errors that can occur reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on key {key}: {source}")]
    Io {
        /// Storage key being accessed.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored value could not be serialized or deserialized.
    #[error("Serialization error on key {key}: {source}")]
    Serde {
        /// Storage key being accessed.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value storage contract.
///
/// Values are raw JSON strings; use [`get_json`]/[`set_json`] for typed
/// access. Removing an absent key is not an error.
pub trait KeyValueStorage: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value stored under `key`.
///
/// # Errors
///
/// Returns `StorageError` on read failure or if the stored JSON is invalid.
pub fn get_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key)? {
        Some(raw) => {
            let value = serde_json::from_str(&raw).map_err(|source| StorageError::Serde {
                key: key.to_string(),
                source,
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize and store a JSON value under `key`.
///
/// # Errors
///
/// Returns `StorageError` on write failure or if the value cannot be
/// serialized.
pub fn set_json<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}

// =============================================================================
// FileStorage
// =============================================================================

/// Filesystem-backed storage: one file per key under a base directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    base: PathBuf,
}

impl FileStorage {
    /// Create a storage instance rooted at `base`.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub const fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.base).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(self.key_path(key), value).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}
