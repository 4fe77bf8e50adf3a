use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::migrate::migrate;
use crate::model::State;

/// File name used for exported backups.
pub const BACKUP_FILE_NAME: &str = "discipline_os_v7_backup.json";

/// Somewhere a single serialized snapshot can live.
pub trait SnapshotStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("reading snapshot {}", self.path.display()))
            }
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("writing snapshot {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != ErrorKind::NotFound => {
                Err(err).with_context(|| format!("removing snapshot {}", self.path.display()))
            }
            _ => Ok(()),
        }
    }
}

/// In-process storage slot, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.slot.lock() = Some(contents.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}

/// Versioned snapshot store on top of a [`SnapshotStorage`].
#[derive(Debug)]
pub struct Store<S> {
    storage: S,
}

impl<S: SnapshotStorage> Store<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Never fails: a missing, unreadable or corrupt snapshot yields defaults.
    pub fn load(&self) -> State {
        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored snapshot; starting from defaults");
                return State::default();
            }
            Err(err) => {
                warn!(%err, "unable to read stored snapshot; starting from defaults");
                return State::default();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => migrate(value),
            Err(err) => {
                warn!(%err, "stored snapshot is corrupt; starting from defaults");
                State::default()
            }
        }
    }

    pub fn save(&self, state: &State) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        self.storage.write(&raw)?;
        Ok(())
    }

    /// Wipes the stored snapshot and returns a fresh default state.
    pub fn reset(&self) -> Result<State, StoreError> {
        self.storage.clear()?;
        info!("stored snapshot cleared");
        Ok(State::default())
    }
}

/// Full state, pretty-printed with two-space indentation.
pub fn export_json(state: &State) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn export_to_dir(state: &State, dir: impl AsRef<Path>) -> Result<PathBuf, StoreError> {
    let dir = dir.as_ref();
    let path = dir.join(BACKUP_FILE_NAME);
    let contents = export_json(state)?;
    fs::create_dir_all(dir)
        .and_then(|_| fs::write(&path, contents))
        .with_context(|| format!("writing backup {}", path.display()))?;
    info!(path = %path.display(), "exported backup");
    Ok(path)
}

/// Parses and migrates an imported snapshot. On error the caller keeps its
/// current state.
pub fn import_json(raw: &str) -> Result<State, StoreError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(migrate(value))
}

pub fn import_file(path: impl AsRef<Path>) -> Result<State, StoreError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading import file {}", path.display()))?;
    import_json(&raw)
}
