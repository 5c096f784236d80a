use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use watch_core::{SeenState, SeenStats};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::persist::{ensure_parent_dir, AtomicFileWriter, PersistError};

/// Source of the timestamp stamped on every save.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const DEFAULT_STALE_LOCK_AFTER: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize seen state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write seen state to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
    #[error("state file {path:?} is locked by another poller")]
    Locked { path: PathBuf },
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How [`StateStore::load`] obtained its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Restored,
    /// No state file yet; expected on first run.
    Missing,
    /// The file exists but is not a valid state document. It is left in place.
    Corrupt(String),
    /// The file exists but could not be read.
    Unreadable(String),
}

impl LoadStatus {
    /// A file exists at the state path but its contents were not used.
    pub fn is_damaged(&self) -> bool {
        matches!(self, LoadStatus::Corrupt(_) | LoadStatus::Unreadable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub state: SeenState,
    pub status: LoadStatus,
}

// On-disk layout. The snake_case aliases accept files written by the older
// script-based checker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default, alias = "last_check_time")]
    last_check_time: Option<String>,
    #[serde(default, alias = "seen_ids")]
    seen_ids: Vec<String>,
    #[serde(default)]
    metadata: PersistedMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedMetadata {
    #[serde(default, alias = "window_size")]
    window_capacity: Option<usize>,
    #[serde(default, alias = "total_checked")]
    total_checked: u64,
}

/// Owns the seen-state file: loading, atomic saving, locking and reset.
pub struct StateStore {
    path: PathBuf,
    capacity: usize,
    clock: Clock,
    stale_lock_after: Option<Duration>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            clock: Arc::new(Utc::now),
            stale_lock_after: Some(DEFAULT_STALE_LOCK_AFTER),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Age after which a leftover lock file is considered abandoned.
    /// `None` never breaks a lock.
    pub fn with_stale_lock_after(mut self, age: Option<Duration>) -> Self {
        self.stale_lock_after = age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Reads the state file. Never fails: a missing, unreadable or corrupt
    /// file yields the default state and is reported through the status.
    pub fn load(&self) -> LoadedState {
        let content = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                watch_info!("No seen state at {:?}; first run, starting empty", self.path);
                return self.fallback(LoadStatus::Missing);
            }
            Err(err) => {
                watch_warn!("Failed to read seen state from {:?}: {}", self.path, err);
                return self.fallback(LoadStatus::Unreadable(err.to_string()));
            }
        };

        let persisted: PersistedState = match serde_json::from_slice(&content) {
            Ok(persisted) => persisted,
            Err(err) => {
                watch_warn!(
                    "Seen state at {:?} is not valid ({}); using defaults and leaving the file for inspection",
                    self.path,
                    err
                );
                return self.fallback(LoadStatus::Corrupt(err.to_string()));
            }
        };

        if let Some(stored) = persisted.metadata.window_capacity {
            if stored != self.capacity {
                watch_info!(
                    "Stored window capacity {} differs from configured {}; using configured",
                    stored,
                    self.capacity
                );
            }
        }

        let state = SeenState {
            last_check_time: persisted
                .last_check_time
                .as_deref()
                .and_then(|raw| self.parse_timestamp(raw)),
            seen_ids: persisted.seen_ids.into_iter().collect(),
            window_capacity: self.capacity,
            total_checked: persisted.metadata.total_checked,
        };
        watch_debug!(
            "Loaded {} seen ids from {:?} (checked {} times)",
            state.seen_ids.len(),
            self.path,
            state.total_checked
        );
        LoadedState {
            state,
            status: LoadStatus::Restored,
        }
    }

    /// Stamps `last_check_time` and atomically replaces the state file.
    pub fn save(&self, state: &mut SeenState) -> Result<(), StoreError> {
        state.last_check_time = Some((self.clock)());

        let persisted = PersistedState {
            last_check_time: state
                .last_check_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            seen_ids: state.ids_by_recency(),
            metadata: PersistedMetadata {
                window_capacity: Some(state.window_capacity),
                total_checked: state.total_checked,
            },
        };
        let content = serde_json::to_string_pretty(&persisted)?;

        let writer = AtomicFileWriter::new(self.path.clone());
        writer.write(&content).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        watch_debug!("Saved {} seen ids to {:?}", state.seen_ids.len(), self.path);
        Ok(())
    }

    /// Takes the advisory lock guarding the state file for one cycle.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        let path = self.lock_path();
        ensure_parent_dir(&path).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        match create_lock_file(&path) {
            Ok(lock) => Ok(lock),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if !self.lock_is_stale(&path) {
                    return Err(StoreError::Locked { path: self.path.clone() });
                }
                watch_warn!("Breaking stale lock {:?}", path);
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(StoreError::Io { path, source }),
                }
                create_lock_file(&path).map_err(|err| match err.kind() {
                    io::ErrorKind::AlreadyExists => StoreError::Locked {
                        path: self.path.clone(),
                    },
                    _ => StoreError::Io {
                        path: path.clone(),
                        source: err,
                    },
                })
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Copies a state file that could not be loaded to `<file>.corrupt` so
    /// that the next save does not destroy the only copy.
    pub fn preserve_corrupt(&self) -> Result<PathBuf, StoreError> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        let backup = self.path.with_file_name(name);
        fs::copy(&self.path, &backup).map_err(|source| StoreError::Io {
            path: backup.clone(),
            source,
        })?;
        watch_warn!("Kept corrupt seen state as {:?}", backup);
        Ok(backup)
    }

    /// Removes the state file. Returns whether there was one to remove.
    pub fn reset(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                watch_info!("Removed seen state {:?}", self.path);
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn stats(&self) -> SeenStats {
        self.load().state.stats()
    }

    fn fallback(&self, status: LoadStatus) -> LoadedState {
        LoadedState {
            state: SeenState::new(self.capacity),
            status,
        }
    }

    fn parse_timestamp(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        watch_warn!("Ignoring unparsable lastCheckTime {:?} in {:?}", raw, self.path);
        None
    }

    fn lock_is_stale(&self, path: &Path) -> bool {
        let Some(limit) = self.stale_lock_after else {
            return false;
        };
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age >= limit)
    }
}

/// Held for the duration of a cycle; removes the lock file when dropped.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            watch_error!("Failed to release lock {:?}: {}", self.path, err);
        }
    }
}

fn create_lock_file(path: &Path) -> io::Result<StateLock> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let lock = StateLock {
        path: path.to_path_buf(),
    };
    writeln!(file, "{}", std::process::id())?;
    Ok(lock)
}
