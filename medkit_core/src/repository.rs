//! Snapshot persistence.
//!
//! The inventory is stored through a small repository trait so the backend
//! can be swapped without touching the store. The default backend keeps the
//! snapshot in a single JSON file guarded by file locks.

use crate::{Error, Result, Snapshot};
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage for the medicines/reminders/last-visit trio
pub trait InventoryRepository {
    /// Read the stored snapshot; an absent store is an empty snapshot
    fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// JSON file repository with file locking
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Create a repository backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InventoryRepository for JsonFileRepository {
    /// Load the snapshot with shared locking
    ///
    /// Returns an empty snapshot if the file doesn't exist.
    /// If the file is unreadable or corrupted, logs a warning and returns an
    /// empty snapshot.
    fn load(&self) -> Result<Snapshot> {
        let path = &self.path;
        if !path.exists() {
            tracing::info!("No inventory file found at {:?}, starting empty", path);
            return Ok(Snapshot::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open inventory file {:?}: {}. Starting empty.",
                    path,
                    e
                );
                return Ok(Snapshot::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock inventory file {:?}: {}. Starting empty.",
                path,
                e
            );
            return Ok(Snapshot::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read inventory file {:?}: {}. Starting empty.",
                path,
                e
            );
            return Ok(Snapshot::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => {
                tracing::debug!(
                    "Loaded {} medicines and {} reminders from {:?}",
                    snapshot.medicines.len(),
                    snapshot.reminders.as_ref().map_or(0, Vec::len),
                    path
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse inventory file {:?}: {}. Starting empty.",
                    path,
                    e
                );
                Ok(Snapshot::default())
            }
        }
    }

    /// Save the snapshot with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original so readers never see a partial snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = &self.path;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved inventory to {:?}", path);
        Ok(())
    }
}

/// In-memory repository, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryRepository {
    snapshot: RefCell<Option<Snapshot>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RefCell::new(Some(snapshot)),
        }
    }

    /// Last saved snapshot, if anything was ever saved
    pub fn saved(&self) -> Option<Snapshot> {
        self.snapshot.borrow().clone()
    }
}

impl InventoryRepository for MemoryRepository {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.borrow().clone().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.borrow_mut() = Some(snapshot.clone());
        Ok(())
    }
}

impl<R: InventoryRepository + ?Sized> InventoryRepository for &R {
    fn load(&self) -> Result<Snapshot> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).save(snapshot)
    }
}
