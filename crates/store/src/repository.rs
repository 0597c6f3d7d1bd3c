//! Record repositories
//!
//! `Repository` is the seam between certificate generation and wherever its
//! bookkeeping lives. [`MemoryRepository`] serves tests and one-shot runs;
//! [`JsonFileRepository`] keeps one JSON array per record kind on disk:
//!
//! ```text
//! store/
//! ├── template.json
//! ├── dataset.json
//! ├── job.json
//! └── certificate.json
//! ```

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::records::Record;

/// Storage for one kind of record.
///
/// Methods take `&self`; implementations synchronize internally so a
/// repository can be shared behind an `Arc`.
pub trait Repository<T: Record>: Send + Sync {
    /// Insert a new record. Fails when its id is already taken.
    fn create(&self, item: T) -> Result<T>;

    /// Every record in insertion order
    fn get_all(&self) -> Result<Vec<T>>;

    fn get_by_id(&self, id: Uuid) -> Result<T>;

    /// Replace the record with the same id
    fn update(&self, item: T) -> Result<T>;

    fn exists(&self, id: Uuid) -> Result<bool> {
        match self.get_by_id(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn not_found<T: Record>(id: Uuid) -> StoreError {
    StoreError::NotFound {
        kind: T::KIND,
        id: id.to_string(),
    }
}

fn insert<T: Record>(items: &mut Vec<T>, item: T) -> Result<T> {
    if items.iter().any(|existing| existing.id() == item.id()) {
        return Err(StoreError::AlreadyExists {
            kind: T::KIND,
            id: item.id().to_string(),
        });
    }
    items.push(item.clone());
    Ok(item)
}

fn replace<T: Record>(items: &mut [T], item: T) -> Result<T> {
    let slot = items
        .iter_mut()
        .find(|existing| existing.id() == item.id())
        .ok_or_else(|| not_found::<T>(item.id()))?;
    *slot = item.clone();
    Ok(item)
}

/// In-memory repository; contents are lost on drop
pub struct MemoryRepository<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Repository<T> for MemoryRepository<T> {
    fn create(&self, item: T) -> Result<T> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        insert(&mut items, item)
    }

    fn get_all(&self) -> Result<Vec<T>> {
        Ok(self.items.read().map_err(|_| StoreError::LockPoisoned)?.clone())
    }

    fn get_by_id(&self, id: Uuid) -> Result<T> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| not_found::<T>(id))
    }

    fn update(&self, item: T) -> Result<T> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        replace(&mut items, item)
    }
}

/// Repository persisted as `<dir>/<kind>.json`.
///
/// Every write rewrites the whole file, so it suits the few hundred records a
/// certificate run produces rather than large archives.
pub struct JsonFileRepository<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T: Record> JsonFileRepository<T> {
    /// Open the collection under `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{}.json", T::KIND)),
            lock: Mutex::new(()),
            _records: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_items(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write through a temporary file so a crash never leaves half a file
    fn write_items(&self, items: &[T]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(items)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl<T: Record> Repository<T> for JsonFileRepository<T> {
    fn create(&self, item: T) -> Result<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut items = self.read_items()?;
        let item = insert(&mut items, item)?;
        self.write_items(&items)?;
        tracing::debug!("Stored {} {}", T::KIND, item.id());
        Ok(item)
    }

    fn get_all(&self) -> Result<Vec<T>> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.read_items()
    }

    fn get_by_id(&self, id: Uuid) -> Result<T> {
        self.get_all()?
            .into_iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| not_found::<T>(id))
    }

    fn update(&self, item: T) -> Result<T> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut items = self.read_items()?;
        let item = replace(&mut items, item)?;
        self.write_items(&items)?;
        Ok(item)
    }
}
