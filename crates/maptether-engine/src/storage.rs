#![forbid(unsafe_code)]

//! Key-value persistence for panel state, filters, and snapshots.
//!
//! The engine persists three values, each JSON under its own versioned
//! key. Decoding is deliberately forgiving: a payload that fails to parse
//! or fails shape validation falls back to the empty/default state with a
//! warning — corrupted local storage must never crash the view. Write
//! failures, by contrast, are surfaced to the caller (the one genuinely
//! unexpected condition, e.g. storage quota exhausted).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::registry::{MarkerId, PanelRegistry, PanelState};
use crate::snapshot::SnapshotStore;

/// Versioned storage keys. Bump the suffix on breaking layout changes.
pub mod keys {
    /// Panel registry payload.
    pub const PANELS: &str = "maptether.panels.v1";
    /// Active category filter selection.
    pub const FILTERS: &str = "maptether.filters.v1";
    /// Named snapshot list, most recent first.
    pub const SNAPSHOTS: &str = "maptether.snapshots.v1";
}

/// Current persisted-panel payload version.
pub const PANELS_SCHEMA_VERSION: u16 = 1;

/// Errors from a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// Backend read/write failure.
    Io { path: PathBuf, source: io::Error },
    /// A value could not be encoded for storage.
    Encode { key: &'static str, source: serde_json::Error },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "storage i/o failure at {}: {source}", path.display())
            }
            Self::Encode { key, source } => {
                write!(f, "failed to encode value for key {key}: {source}")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
        }
    }
}

/// Minimal key-value storage seam.
///
/// Implemented in-memory for tests and as a JSON file for desktop hosts;
/// web hosts bridge to their own storage primitive.
pub trait KeyValueStore {
    /// Read the value for `key`, if present.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Write the value for `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key` if present.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Single-file JSON store: one object mapping keys to string values.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use (or create on first write) the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source: err,
                });
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                // A mangled store file loses its contents, not the session.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "storage file corrupted, starting from empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(entries).map_err(|source| StorageError::Encode {
            key: "store",
            source,
        })?;
        fs::write(&self.path, encoded).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Versioned wrapper around the persisted panel map.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedPanels {
    #[serde(default)]
    schema_version: u16,
    panels: BTreeMap<MarkerId, PanelState>,
}

/// Decode a stored JSON value, falling back to the default on corruption.
fn decode_or_default<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "persisted state corrupted, using default");
            T::default()
        }
    }
}

/// Persist the panel registry.
pub fn store_panels(
    store: &mut dyn KeyValueStore,
    registry: &PanelRegistry,
) -> Result<(), StorageError> {
    let payload = PersistedPanels {
        schema_version: PANELS_SCHEMA_VERSION,
        panels: registry.to_map(),
    };
    let encoded = serde_json::to_string(&payload).map_err(|source| StorageError::Encode {
        key: keys::PANELS,
        source,
    })?;
    store.set(keys::PANELS, &encoded)
}

/// Load the persisted panel registry, or empty on absence/corruption.
pub fn load_panels(store: &dyn KeyValueStore) -> Result<PanelRegistry, StorageError> {
    let payload: Option<PersistedPanels> = match store.get(keys::PANELS)? {
        None => None,
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::warn!(
                    key = keys::PANELS,
                    error = %err,
                    "persisted panels corrupted, starting empty"
                );
                None
            }
        },
    };
    let mut registry = PanelRegistry::new();
    if let Some(payload) = payload {
        if payload.schema_version == PANELS_SCHEMA_VERSION {
            registry.replace_all(payload.panels);
        } else {
            tracing::warn!(
                found = payload.schema_version,
                expected = PANELS_SCHEMA_VERSION,
                "persisted panels from unsupported schema, starting empty"
            );
        }
    }
    Ok(registry)
}

/// Persist the category-filter selection.
pub fn store_filters(
    store: &mut dyn KeyValueStore,
    filters: &[String],
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(filters).map_err(|source| StorageError::Encode {
        key: keys::FILTERS,
        source,
    })?;
    store.set(keys::FILTERS, &encoded)
}

/// Load the category-filter selection, or empty on absence/corruption.
pub fn load_filters(store: &dyn KeyValueStore) -> Result<Vec<String>, StorageError> {
    Ok(decode_or_default(keys::FILTERS, store.get(keys::FILTERS)?))
}

/// Persist the snapshot store (records and id counter).
pub fn store_snapshots(
    store: &mut dyn KeyValueStore,
    snapshots: &SnapshotStore,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(snapshots).map_err(|source| StorageError::Encode {
        key: keys::SNAPSHOTS,
        source,
    })?;
    store.set(keys::SNAPSHOTS, &encoded)
}

/// Load the snapshot store, or a fresh one with the given cap.
pub fn load_snapshots(
    store: &dyn KeyValueStore,
    cap: usize,
) -> Result<SnapshotStore, StorageError> {
    match store.get(keys::SNAPSHOTS)? {
        None => Ok(SnapshotStore::new(cap)),
        Some(raw) => match serde_json::from_str::<SnapshotStore>(&raw) {
            Ok(mut snapshots) => {
                // Drop records a newer schema wrote; keep the rest.
                snapshots.retain_valid();
                snapshots.set_cap(cap);
                Ok(snapshots)
            }
            Err(err) => {
                tracing::warn!(
                    key = keys::SNAPSHOTS,
                    error = %err,
                    "persisted snapshots corrupted, starting empty"
                );
                Ok(SnapshotStore::new(cap))
            }
        },
    }
}
