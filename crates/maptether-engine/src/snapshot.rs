#![forbid(unsafe_code)]

//! Named registry snapshots.
//!
//! A snapshot is a deep copy of the panel registry plus the viewport
//! (center, zoom) and the active category filters, created on explicit
//! user action. Snapshots are immutable after creation except for title
//! edits; restoring one replaces the live registry wholesale — never a
//! merge — so there is no ordering ambiguity between old and restored
//! entries. The store keeps records most-recent-first and evicts the
//! oldest beyond its cap.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use maptether_core::geo::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::registry::{MarkerId, PanelRegistry, PanelState};

/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u16 = 1;

fn default_snapshot_version() -> u16 {
    SNAPSHOT_SCHEMA_VERSION
}

/// Stable identifier for a saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(u64);

impl SnapshotId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One saved arrangement of panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for migration detection.
    #[serde(default = "default_snapshot_version")]
    pub schema_version: u16,
    pub id: SnapshotId,
    /// User-editable title.
    pub title: String,
    /// Creation time in milliseconds since the Unix epoch, supplied by the
    /// caller (the engine carries no ambient clock).
    pub timestamp_ms: u64,
    /// Deep copy of the registry at save time.
    pub panels: BTreeMap<MarkerId, PanelState>,
    pub viewport_center: GeoPoint,
    pub viewport_zoom: f64,
    /// Category filter selection active at save time.
    pub active_category_filters: Vec<String>,
    /// Denormalized panel count for list UIs; must equal `panels.len()`.
    pub panel_count: usize,
}

impl Snapshot {
    /// Validate schema version and internal consistency.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchemaVersion {
                found: self.schema_version,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        if self.panel_count != self.panels.len() {
            return Err(SnapshotError::PanelCountMismatch {
                id: self.id,
                recorded: self.panel_count,
                actual: self.panels.len(),
            });
        }
        Ok(())
    }

    /// Deterministic hash for cheap change detection.
    ///
    /// `BTreeMap` iteration is id-sorted, so equal snapshots hash equally
    /// regardless of insertion history.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.schema_version.hash(&mut hasher);
        self.id.0.hash(&mut hasher);
        self.timestamp_ms.hash(&mut hasher);
        self.viewport_center.lat.to_bits().hash(&mut hasher);
        self.viewport_center.lng.to_bits().hash(&mut hasher);
        self.viewport_zoom.to_bits().hash(&mut hasher);
        for filter in &self.active_category_filters {
            filter.hash(&mut hasher);
        }
        for (id, panel) in &self.panels {
            id.as_str().hash(&mut hasher);
            panel.floating_position.lat.to_bits().hash(&mut hasher);
            panel.floating_position.lng.to_bits().hash(&mut hasher);
            panel.minimized.hash(&mut hasher);
            panel.user_positioned.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Errors from snapshot validation and restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Restore referenced a deleted or never-saved snapshot.
    UnknownSnapshot { id: SnapshotId },
    /// The stored record was written by an incompatible schema.
    UnsupportedSchemaVersion { found: u16, expected: u16 },
    /// The denormalized count disagrees with the panel map.
    PanelCountMismatch {
        id: SnapshotId,
        recorded: usize,
        actual: usize,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSnapshot { id } => write!(f, "unknown snapshot {id}"),
            Self::UnsupportedSchemaVersion { found, expected } => {
                write!(f, "unsupported snapshot schema version {found} (expected {expected})")
            }
            Self::PanelCountMismatch {
                id,
                recorded,
                actual,
            } => write!(
                f,
                "snapshot {id} records {recorded} panels but contains {actual}"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Capped, most-recent-first collection of snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStore {
    /// Most recent first.
    snapshots: Vec<Snapshot>,
    next_id: u64,
    cap: usize,
}

impl SnapshotStore {
    /// Create an empty store holding at most `cap` snapshots.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            next_id: 1,
            cap,
        }
    }

    /// Save the current registry as a new snapshot.
    ///
    /// The newest record goes to the front; the oldest falls off the back
    /// once the cap is exceeded.
    pub fn save(
        &mut self,
        title: impl Into<String>,
        registry: &PanelRegistry,
        viewport_center: GeoPoint,
        viewport_zoom: f64,
        active_category_filters: Vec<String>,
        timestamp_ms: u64,
    ) -> SnapshotId {
        let id = SnapshotId(self.next_id);
        self.next_id += 1;
        let panels = registry.to_map();
        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            id,
            title: title.into(),
            timestamp_ms,
            panel_count: panels.len(),
            panels,
            viewport_center,
            viewport_zoom,
            active_category_filters,
        };
        tracing::debug!(snapshot = %id, panels = snapshot.panel_count, "saved snapshot");
        self.snapshots.insert(0, snapshot);
        while self.snapshots.len() > self.cap {
            let evicted = self.snapshots.pop();
            if let Some(evicted) = evicted {
                tracing::debug!(snapshot = %evicted.id, "evicted oldest snapshot");
            }
        }
        id
    }

    /// Replace the live registry with a saved snapshot's panels.
    ///
    /// Returns the restored snapshot so the caller can also re-apply the
    /// saved viewport and filters.
    pub fn restore(
        &self,
        id: SnapshotId,
        registry: &mut PanelRegistry,
    ) -> Result<&Snapshot, SnapshotError> {
        let snapshot = self
            .snapshots
            .iter()
            .find(|s| s.id == id)
            .ok_or(SnapshotError::UnknownSnapshot { id })?;
        snapshot.validate()?;
        registry.replace_all(snapshot.panels.clone());
        tracing::debug!(snapshot = %id, panels = snapshot.panel_count, "restored snapshot");
        Ok(snapshot)
    }

    /// Rename a snapshot. Returns false for unknown ids.
    pub fn rename(&mut self, id: SnapshotId, title: impl Into<String>) -> bool {
        match self.snapshots.iter_mut().find(|s| s.id == id) {
            Some(snapshot) => {
                snapshot.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Delete one snapshot. Returns false for unknown ids.
    pub fn delete(&mut self, id: SnapshotId) -> bool {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        before != self.snapshots.len()
    }

    /// Delete every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Snapshots, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Look up one snapshot.
    #[must_use]
    pub fn get(&self, id: SnapshotId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Maximum retained snapshots.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Change the cap, evicting oldest records if the new cap is smaller.
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        while self.snapshots.len() > self.cap {
            self.snapshots.pop();
        }
    }

    /// Drop records that fail validation (e.g. written by a newer schema).
    pub fn retain_valid(&mut self) {
        self.snapshots.retain(|s| match s.validate() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(snapshot = %s.id, error = %err, "dropping invalid snapshot");
                false
            }
        });
    }
}
