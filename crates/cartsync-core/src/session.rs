//! Cart session store
//!
//! Holds the one cart identifier a shopper is building. The identifier lives
//! in durable key-value storage so it survives reloads, and every update goes
//! through compare-and-set so a writer can only replace the id it last saw.

use crate::error::SessionError;
use crate::types::CartId;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable string storage keyed by name
pub trait SessionStorage: Send + Sync + fmt::Debug {
    /// Read a value; `None` when the key was never written
    fn load(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Write a value, replacing any previous one
    fn store(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Drop a value
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object file
///
/// A missing file reads as empty. Writes rewrite the whole document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage backed by the JSON file at `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// File this storage reads and writes
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(SessionError::io_error(&self.path, e)),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SessionError::io_error(parent, e))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        std::fs::write(&self.path, bytes).map_err(|e| SessionError::io_error(&self.path, e))
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock();
        Ok(self.read_document()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// Handle to the active cart session
///
/// The gateway's success path is the only writer; everything else reads.
#[derive(Debug)]
pub struct CartSession {
    storage: Arc<dyn SessionStorage>,
    key: String,
    current: RwLock<Option<CartId>>,
}

impl CartSession {
    /// Open the session stored under `key`
    pub fn open(
        storage: Arc<dyn SessionStorage>,
        key: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let key = key.into();
        let current = storage
            .load(&key)?
            .filter(|id| !id.trim().is_empty())
            .map(CartId::new);
        if let Some(id) = &current {
            tracing::debug!(cart_id = %id, "restored cart session");
        }
        Ok(Self {
            storage,
            key,
            current: RwLock::new(current),
        })
    }

    /// Session with no durable backing, starting empty
    #[must_use]
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            key: key.into(),
            current: RwLock::new(None),
        }
    }

    /// Current cart identifier
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<CartId> {
        self.current.read().clone()
    }

    /// Whether a cart has been created
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.read().is_some()
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the identifier if it still equals `expected`
    ///
    /// The new value is persisted before it becomes visible to readers.
    /// On conflict nothing is written.
    pub fn compare_and_set(
        &self,
        expected: Option<&CartId>,
        next: CartId,
    ) -> Result<(), SessionError> {
        let mut current = self.current.write();
        if current.as_ref() != expected {
            return Err(SessionError::Conflict {
                expected: expected.cloned(),
                actual: current.clone(),
            });
        }
        if current.as_ref() == Some(&next) {
            return Ok(());
        }
        self.storage.store(&self.key, next.as_str())?;
        tracing::info!(cart_id = %next, replaced = current.is_some(), "cart session updated");
        *current = Some(next);
        Ok(())
    }

    /// Forget the cart if it still equals `expected`
    pub fn clear(&self, expected: &CartId) -> Result<(), SessionError> {
        let mut current = self.current.write();
        if current.as_ref() != Some(expected) {
            return Err(SessionError::Conflict {
                expected: Some(expected.clone()),
                actual: current.clone(),
            });
        }
        self.storage.remove(&self.key)?;
        *current = None;
        Ok(())
    }
}
