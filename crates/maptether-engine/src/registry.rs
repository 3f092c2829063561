#![forbid(unsafe_code)]

//! Panel registry: the single source of truth for open panels.
//!
//! # Invariants
//!
//! 1. Exactly one entry per open panel; `close` removes the entry outright,
//!    never leaves it dangling.
//! 2. Every mutation fully replaces the affected entry before returning, so
//!    consumers never observe a half-updated panel.
//! 3. `open` on an already-open id is an idempotent merge: the anchor is
//!    refreshed, but `user_positioned`, `minimized`, size, and the floating
//!    position survive.
//! 4. Mutations referencing unknown ids are logged no-ops, never errors —
//!    a drag-end can legitimately race a close on the UI thread.
//!
//! Entries live in a `BTreeMap` so iteration order is deterministic, which
//! keeps arrangement passes and serialized snapshots reproducible.

use std::collections::BTreeMap;
use std::fmt;

use maptether_core::geo::{GeoPoint, PixelSize};
use serde::{Deserialize, Serialize};

/// Stable identifier for a marker (and its panel), supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    /// Wrap a host-supplied identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// State of one open panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    /// The marker's fixed geographic position; never mutated by the engine.
    pub anchor: GeoPoint,
    /// The panel's own geographic anchor point (its center).
    pub floating_position: GeoPoint,
    /// Whether the panel is collapsed to its minimized height.
    pub minimized: bool,
    /// True once a drag or an arrangement strategy set a deliberate
    /// position; false only between first open and the first placement
    /// decision.
    pub user_positioned: bool,
    /// Current panel dimensions (default or user-resized).
    pub size: PixelSize,
}

impl PanelState {
    /// Fresh state for a just-opened panel: floating at the anchor, not yet
    /// deliberately positioned.
    #[must_use]
    pub fn opened_at(anchor: GeoPoint, size: PixelSize) -> Self {
        Self {
            anchor,
            floating_position: anchor,
            minimized: false,
            user_positioned: false,
            size,
        }
    }

    /// Dimensions to use for bounds math right now.
    ///
    /// Minimized panels keep their width but collapse to the minimized
    /// height. Overlap detection must always go through this — a stale
    /// expanded size after minimizing silently breaks it.
    #[must_use]
    pub fn effective_size(&self, minimized_height_px: f64) -> PixelSize {
        if self.minimized {
            PixelSize::new(self.size.width, minimized_height_px)
        } else {
            self.size
        }
    }
}

/// Authoritative map from marker id to panel state.
#[derive(Debug, Default, Clone)]
pub struct PanelRegistry {
    panels: BTreeMap<MarkerId, PanelState>,
}

impl PanelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a panel for `id`, or merge into an existing one.
    ///
    /// Returns `true` when a new entry was created. On an already-open id
    /// only the anchor is refreshed (markers can be re-resolved with
    /// corrected coordinates); placement state is preserved.
    pub fn open(&mut self, id: MarkerId, anchor: GeoPoint, default_size: PixelSize) -> bool {
        if let Some(existing) = self.panels.get_mut(&id) {
            tracing::debug!(marker = %id, "open on already-open panel, merging anchor");
            existing.anchor = anchor;
            return false;
        }
        tracing::debug!(marker = %id, "opening panel");
        self.panels
            .insert(id, PanelState::opened_at(anchor, default_size));
        true
    }

    /// Close the panel for `id`. No-op on unknown ids.
    pub fn close(&mut self, id: &MarkerId) -> bool {
        if self.panels.remove(id).is_some() {
            tracing::debug!(marker = %id, "closed panel");
            true
        } else {
            tracing::debug!(marker = %id, "close on unknown panel, ignoring");
            false
        }
    }

    /// Move a panel's floating position.
    ///
    /// Marks the panel as deliberately positioned: the only position that
    /// is ever *not* user-positioned is the just-opened default.
    pub fn set_floating(&mut self, id: &MarkerId, position: GeoPoint) {
        match self.panels.get_mut(id) {
            Some(panel) => {
                panel.floating_position = position;
                panel.user_positioned = true;
            }
            None => tracing::debug!(marker = %id, "set_floating on unknown panel, ignoring"),
        }
    }

    /// Set or clear the minimized flag.
    pub fn set_minimized(&mut self, id: &MarkerId, minimized: bool) {
        match self.panels.get_mut(id) {
            Some(panel) => panel.minimized = minimized,
            None => tracing::debug!(marker = %id, "set_minimized on unknown panel, ignoring"),
        }
    }

    /// Commit a user resize.
    pub fn set_size(&mut self, id: &MarkerId, size: PixelSize) {
        match self.panels.get_mut(id) {
            Some(panel) => panel.size = size,
            None => tracing::debug!(marker = %id, "set_size on unknown panel, ignoring"),
        }
    }

    /// Apply an arrangement plan: one batch of floating positions.
    ///
    /// Unknown ids in the plan are skipped (a panel may have closed between
    /// planning and application). Every applied panel becomes
    /// user-positioned.
    pub fn bulk_set_floating(&mut self, positions: impl IntoIterator<Item = (MarkerId, GeoPoint)>) {
        for (id, position) in positions {
            self.set_floating(&id, position);
        }
    }

    /// Whether a panel is open for `id`.
    #[must_use]
    pub fn has(&self, id: &MarkerId) -> bool {
        self.panels.contains_key(id)
    }

    /// Read one panel's state.
    #[must_use]
    pub fn get(&self, id: &MarkerId) -> Option<&PanelState> {
        self.panels.get(id)
    }

    /// Number of open panels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    /// Whether no panels are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Iterate panels in deterministic (id-sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&MarkerId, &PanelState)> {
        self.panels.iter()
    }

    /// Deep copy of the panel map, for snapshots.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<MarkerId, PanelState> {
        self.panels.clone()
    }

    /// Replace the registry wholesale (snapshot restore). Never a merge.
    pub fn replace_all(&mut self, panels: BTreeMap<MarkerId, PanelState>) {
        tracing::debug!(count = panels.len(), "replacing panel registry wholesale");
        self.panels = panels;
    }
}
