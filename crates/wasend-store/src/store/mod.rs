//! File-backed record store.
//!
//! Split into focused submodules:
//! - `contacts`: address book CRUD
//! - `groups`: named contact sets and member expansion
//! - `templates`: message templates with extracted variables
//! - `logs`: append-only message log, paging and stats
//!
//! Each collection is a `{ "lastId": n, "items": [...] }` document. The JSON
//! backend re-reads the file on every operation and rewrites it through a
//! temp file plus rename on every change; a per-collection mutex serializes
//! operations within the process.

mod contacts;
mod groups;
mod logs;
mod templates;

#[cfg(test)]
mod tests;

pub use logs::{LogPage, LogStats};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use wasend_core::config::{Config, StorageBackend};
use wasend_core::error::WasendError;

/// A record kept in a collection.
pub(crate) trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Noun used in not-found errors.
    const KIND: &'static str;
    /// File name under the storage directory.
    const FILE: &'static str;

    fn id(&self) -> u64;
}

/// On-disk shape of a collection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Document<T> {
    #[serde(default)]
    pub(crate) last_id: u64,
    #[serde(default = "Vec::new")]
    pub(crate) items: Vec<T>,
}

impl<T> Default for Document<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            items: Vec::new(),
        }
    }
}

impl<T> Document<T> {
    /// Reserve the next id. Ids are never reused, even after deletes.
    pub(crate) fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// One collection, either file-backed or held in memory.
pub(crate) struct Collection<T> {
    path: Option<PathBuf>,
    doc: Mutex<Document<T>>,
}

impl<T: Record> Collection<T> {
    fn new(dir: Option<&Path>) -> Self {
        Self {
            path: dir.map(|d| d.join(T::FILE)),
            doc: Mutex::new(Document::default()),
        }
    }

    async fn load(&self, doc: &mut Document<T>) -> Result<(), WasendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                *doc = serde_json::from_slice(&bytes).map_err(|e| {
                    WasendError::Store(format!("corrupt {}: {e}", path.display()))
                })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                *doc = Document::default();
            }
            Err(e) => {
                return Err(WasendError::Store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        }
        Ok(())
    }

    async fn persist(&self, doc: &Document<T>) -> Result<(), WasendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(doc)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| WasendError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| WasendError::Store(format!("failed to replace {}: {e}", path.display())))?;
        debug!("{} saved ({} items)", T::FILE, doc.items.len());
        Ok(())
    }

    /// Run `f` against the current document without saving.
    pub(crate) async fn read<R>(
        &self,
        f: impl FnOnce(&Document<T>) -> R,
    ) -> Result<R, WasendError> {
        let mut doc = self.doc.lock().await;
        self.load(&mut doc).await?;
        Ok(f(&doc))
    }

    /// Run `f` against the current document and save it if `f` succeeds.
    pub(crate) async fn write<R>(
        &self,
        f: impl FnOnce(&mut Document<T>) -> Result<R, WasendError>,
    ) -> Result<R, WasendError> {
        let mut doc = self.doc.lock().await;
        self.load(&mut doc).await?;
        let out = f(&mut doc)?;
        self.persist(&doc).await?;
        Ok(out)
    }

    pub(crate) async fn list(&self) -> Result<Vec<T>, WasendError> {
        self.read(|doc| doc.items.clone()).await
    }

    pub(crate) async fn get(&self, id: u64) -> Result<T, WasendError> {
        self.read(|doc| doc.items.iter().find(|r| r.id() == id).cloned())
            .await?
            .ok_or(WasendError::NotFound { kind: T::KIND, id })
    }

    /// Append a record built from a freshly reserved id.
    pub(crate) async fn insert(&self, build: impl FnOnce(u64) -> T) -> Result<T, WasendError> {
        self.write(|doc| {
            let record = build(doc.next_id());
            doc.items.push(record.clone());
            Ok(record)
        })
        .await
    }

    pub(crate) async fn update(
        &self,
        id: u64,
        apply: impl FnOnce(&mut T),
    ) -> Result<T, WasendError> {
        self.write(|doc| {
            let record = doc
                .items
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or(WasendError::NotFound { kind: T::KIND, id })?;
            apply(record);
            Ok(record.clone())
        })
        .await
    }

    pub(crate) async fn remove(&self, id: u64) -> Result<T, WasendError> {
        self.write(|doc| {
            let pos = doc
                .items
                .iter()
                .position(|r| r.id() == id)
                .ok_or(WasendError::NotFound { kind: T::KIND, id })?;
            Ok(doc.items.remove(pos))
        })
        .await
    }

    pub(crate) async fn len(&self) -> Result<usize, WasendError> {
        self.read(|doc| doc.items.len()).await
    }
}

/// Record counts per collection, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub contacts: usize,
    pub groups: usize,
    pub templates: usize,
    pub logs: usize,
}

/// Contacts, groups, templates and message logs.
#[derive(Clone)]
pub struct Store {
    backend: StorageBackend,
    dir: Option<PathBuf>,
    contacts: Arc<Collection<wasend_core::records::Contact>>,
    groups: Arc<Collection<wasend_core::records::Group>>,
    templates: Arc<Collection<wasend_core::records::Template>>,
    logs: Arc<Collection<wasend_core::records::MessageLog>>,
}

impl Store {
    /// Open a store with JSON files under `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WasendError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            WasendError::Store(format!("failed to create {}: {e}", dir.display()))
        })?;
        info!("Record store initialized at {}", dir.display());
        Ok(Self::build(StorageBackend::Json, Some(dir)))
    }

    /// An in-memory store; contents are lost when it is dropped.
    pub fn memory() -> Self {
        info!("Record store initialized in memory");
        Self::build(StorageBackend::Memory, None)
    }

    /// Open the store described by `config.storage`.
    pub async fn from_config(config: &Config) -> Result<Self, WasendError> {
        match config.storage.backend {
            StorageBackend::Json => Self::open(config.storage_dir()).await,
            StorageBackend::Memory => Ok(Self::memory()),
        }
    }

    fn build(backend: StorageBackend, dir: Option<PathBuf>) -> Self {
        let d = dir.as_deref();
        Self {
            backend,
            contacts: Arc::new(Collection::new(d)),
            groups: Arc::new(Collection::new(d)),
            templates: Arc::new(Collection::new(d)),
            logs: Arc::new(Collection::new(d)),
            dir,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// Storage directory, `None` for the memory backend.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub async fn counts(&self) -> Result<StoreCounts, WasendError> {
        Ok(StoreCounts {
            contacts: self.contacts.len().await?,
            groups: self.groups.len().await?,
            templates: self.templates.len().await?,
            logs: self.logs.len().await?,
        })
    }
}
