//! Local persistent store.
//!
//! Process-local, synchronous, survives restarts and is independent of the
//! identity. The orchestrator keeps the persisted cart here.

use std::fs;
use std::io::{self, Write as _};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read and replace a persisted list of records.
pub trait LocalStore<T>: Send + 'static {
    /// Read the stored records. A store that was never written is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data cannot be read or decoded.
    fn read(&self) -> Result<Vec<T>, StoreError>;

    /// Replace the stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be written.
    fn write(&mut self, records: &[T]) -> Result<(), StoreError>;
}

/// A JSON array in a single file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a reader never sees a half-written file.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl<T> LocalStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn read(&self) -> Result<Vec<T>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, records: &[T]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), count = records.len(), "Wrote local store");
        Ok(())
    }
}

/// In-memory store. Clones share the same records.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: Arc<Mutex<Vec<T>>>,
    writes: Arc<AtomicUsize>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            writes: Arc::clone(&self.writes),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl<T> MemoryStore<T> {
    #[must_use]
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl<T: Clone> MemoryStore<T> {
    /// A copy of the stored records.
    #[must_use]
    pub fn records(&self) -> Vec<T> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> LocalStore<T> for MemoryStore<T>
where
    T: Clone + Send + 'static,
{
    fn read(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.records())
    }

    fn write(&mut self, records: &[T]) -> Result<(), StoreError> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
