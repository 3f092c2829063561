#![forbid(unsafe_code)]

//! The overlay engine facade.
//!
//! [`OverlayEngine`] wires the registry, gesture controller, tether
//! renderer, arrangement planners, and snapshot store to one
//! [`ViewportProvider`] and one [`TetherSurface`]. The host adapter feeds
//! it three input streams — panel open/close, pointer events, and
//! normalized viewport events — and the engine keeps everything else
//! consistent.
//!
//! # Failure Modes
//!
//! - Projection/bounds unavailable: the affected operation becomes a safe,
//!   retryable no-op. Tether refreshes re-run on the next viewport-idle
//!   event; arrangement calls return `false` and may simply be invoked
//!   again. Nothing here panics into host code.
//! - Gesture commits with no projection: the panel keeps its last committed
//!   position, the drag override is released, and panning is re-enabled —
//!   a gesture never strands a panel.

use maptether_core::bounds::panel_bounds;
use maptether_core::geo::{GeoPoint, PixelPoint};
use maptether_core::intersect::overlaps;
use maptether_core::project::{to_geo, to_pixel};
use maptether_core::viewport::{ViewportGesture, ViewportProvider, ViewportState};
use web_time::Instant;

use crate::arrange::{ArrangeItem, avoid_overlap, edge_plan, radial_plan};
use crate::config::EngineConfig;
use crate::events::{EventHub, SubscriptionHandle, ViewportChanged, ViewportEventKind};
use crate::gesture::{GestureController, GestureEffect};
use crate::registry::{MarkerId, PanelRegistry};
use crate::snapshot::{SnapshotError, SnapshotId, SnapshotStore};
use crate::storage::{
    KeyValueStore, StorageError, load_filters, load_panels, load_snapshots, store_filters,
    store_panels, store_snapshots,
};
use crate::tether::{TetherRenderer, TetherSurface, ZoomRedrawDriver};

/// Overlay placement engine bound to a host map and a tether surface.
pub struct OverlayEngine<P: ViewportProvider> {
    provider: P,
    surface: Box<dyn TetherSurface>,
    config: EngineConfig,
    registry: PanelRegistry,
    gestures: GestureController,
    tether: TetherRenderer,
    zoom_driver: ZoomRedrawDriver,
    hub: EventHub,
    snapshots: SnapshotStore,
    viewport_gesture: ViewportGesture,
    category_filters: Vec<String>,
}

impl<P: ViewportProvider> OverlayEngine<P> {
    /// Create an engine with no open panels.
    #[must_use]
    pub fn new(provider: P, surface: Box<dyn TetherSurface>, config: EngineConfig) -> Self {
        let gestures = GestureController::new(config.gesture.clone());
        let zoom_driver = ZoomRedrawDriver::new(config.zoom_settle);
        let snapshots = SnapshotStore::new(config.max_snapshots);
        Self {
            provider,
            surface,
            config,
            registry: PanelRegistry::new(),
            gestures,
            tether: TetherRenderer::new(),
            zoom_driver,
            hub: EventHub::new(),
            snapshots,
            viewport_gesture: ViewportGesture::Idle,
            category_filters: Vec::new(),
        }
    }

    /// The live panel registry (read-only; mutate through engine methods).
    #[must_use]
    pub fn registry(&self) -> &PanelRegistry {
        &self.registry
    }

    /// Saved snapshots.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Current global viewport gesture.
    #[must_use]
    pub fn viewport_gesture(&self) -> ViewportGesture {
        self.viewport_gesture
    }

    /// Active category-filter selection.
    #[must_use]
    pub fn category_filters(&self) -> &[String] {
        &self.category_filters
    }

    /// Replace the category-filter selection.
    pub fn set_category_filters(&mut self, filters: Vec<String>) {
        self.category_filters = filters;
    }

    /// Observe the normalized viewport event stream. Dropping the handle
    /// unsubscribes.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ViewportChanged) + 'static,
    ) -> SubscriptionHandle {
        self.hub.subscribe(callback)
    }

    fn viewport(&self) -> Option<ViewportState> {
        match self.provider.viewport() {
            Ok(viewport) => Some(viewport),
            Err(err) => {
                tracing::debug!(error = %err, "viewport not ready, deferring");
                None
            }
        }
    }

    /// Recompute every tether; a no-op when projection is unavailable
    /// (retried automatically on the next viewport event).
    fn refresh_tethers(&mut self) {
        let Some(viewport) = self.viewport() else {
            return;
        };
        if let Err(err) = self.tether.refresh(&self.registry, &viewport, self.surface.as_mut()) {
            tracing::debug!(error = %err, "tether refresh deferred");
        }
    }

    /// Open a panel for `id` anchored at `anchor`.
    ///
    /// A brand-new panel opens at its anchor; if that default position
    /// collides with existing panels, the overlap-avoidance fallback nudges
    /// it (which marks it user-positioned). Re-opening an open id merges
    /// and never resets placement state.
    pub fn open_panel(&mut self, id: MarkerId, anchor: GeoPoint) {
        let created = self
            .registry
            .open(id.clone(), anchor, self.config.default_panel_size);
        if created {
            self.place_avoiding_overlap(&id, anchor);
        }
        self.refresh_tethers();
    }

    /// Default-placement collision check + fallback for a just-opened panel.
    fn place_avoiding_overlap(&mut self, id: &MarkerId, proposed: GeoPoint) {
        let Some(viewport) = self.viewport() else {
            return;
        };
        let minimized_height = self.config.minimized_height_px;
        let Some(panel) = self.registry.get(id) else {
            return;
        };
        let size = panel.effective_size(minimized_height);
        let Ok(proposed_bounds) = panel_bounds(proposed, size, &viewport) else {
            return;
        };
        let others: Vec<_> = self
            .registry
            .iter()
            .filter(|(other, _)| *other != id)
            .filter_map(|(_, p)| {
                panel_bounds(
                    p.floating_position,
                    p.effective_size(minimized_height),
                    &viewport,
                )
                .ok()
            })
            .collect();
        if !others.iter().any(|o| overlaps(&proposed_bounds, o)) {
            return;
        }
        match avoid_overlap(
            proposed,
            size,
            &others,
            &viewport,
            self.config.min_separation_px,
        ) {
            Ok(placed) if placed != proposed => {
                tracing::debug!(marker = %id, "default position collided, nudged by fallback");
                self.registry.set_floating(id, placed);
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "overlap fallback deferred"),
        }
    }

    /// Close the panel for `id`; a no-op for unknown ids.
    pub fn close_panel(&mut self, id: &MarkerId) {
        self.registry.close(id);
        self.gestures.reset(id);
        self.tether.remove(id, self.surface.as_mut());
    }

    /// Minimize or restore a panel.
    pub fn set_minimized(&mut self, id: &MarkerId, minimized: bool) {
        self.registry.set_minimized(id, minimized);
        self.refresh_tethers();
    }

    /// Feed one normalized viewport event.
    ///
    /// Updates the global gesture mode, drives the zoom redraw window,
    /// refreshes tethers, and fans the event out to subscribers.
    pub fn handle_viewport_event(&mut self, kind: ViewportEventKind, now: Instant) {
        match kind {
            ViewportEventKind::DragStart | ViewportEventKind::Drag => {
                self.viewport_gesture = ViewportGesture::Panning;
            }
            ViewportEventKind::DragEnd | ViewportEventKind::Idle => {
                self.viewport_gesture = ViewportGesture::Idle;
            }
            ViewportEventKind::ZoomStart => {
                self.viewport_gesture = ViewportGesture::Zooming;
                self.zoom_driver.on_zoom_start();
            }
            ViewportEventKind::ZoomEnd => {
                self.viewport_gesture = ViewportGesture::Idle;
                self.zoom_driver.on_zoom_end(now);
            }
            ViewportEventKind::BoundsChanged
            | ViewportEventKind::CenterChanged
            | ViewportEventKind::ZoomChanged
            | ViewportEventKind::Resized => {}
        }
        self.refresh_tethers();
        if let Some(viewport) = self.viewport() {
            self.hub.publish(&ViewportChanged { kind, viewport });
        }
    }

    /// Animation-frame tick; redraws tethers while a zoom (or its settle
    /// window) is active.
    pub fn on_frame(&mut self, now: Instant) {
        if self.zoom_driver.is_active(now) {
            self.refresh_tethers();
        }
    }

    /// Stop the zoom redraw window immediately.
    pub fn cancel_zoom_redraw(&mut self) {
        self.zoom_driver.cancel();
    }

    /// Pointer pressed on a panel.
    pub fn pointer_down(&mut self, id: &MarkerId, pointer: PixelPoint) {
        let Some(viewport) = self.viewport() else {
            tracing::debug!(marker = %id, "ignoring press, viewport not ready");
            return;
        };
        let Some(panel) = self.registry.get(id) else {
            tracing::debug!(marker = %id, "press on unknown panel, ignoring");
            return;
        };
        let Ok(center) = to_pixel(panel.floating_position, &viewport) else {
            tracing::debug!(marker = %id, "ignoring press, projection not ready");
            return;
        };
        let effects = self.gestures.pointer_down(id.clone(), pointer, center);
        self.apply_effects(effects);
    }

    /// Pointer moved during a drag.
    pub fn pointer_move(&mut self, id: &MarkerId, pointer: PixelPoint) {
        let effects = self.gestures.pointer_move(id, pointer);
        self.apply_effects(effects);
    }

    /// Pointer released; commits the drag.
    pub fn pointer_up(&mut self, id: &MarkerId, pointer: PixelPoint) {
        let effects = self.gestures.pointer_up(id, pointer);
        self.apply_effects(effects);
    }

    /// Pointer tracking lost (window blur); commits at the last known
    /// position.
    pub fn pointer_lost(&mut self, id: &MarkerId) {
        let effects = self.gestures.pointer_lost(id);
        self.apply_effects(effects);
    }

    /// Pointer pressed on a panel's resize affordance.
    pub fn resize_down(&mut self, id: &MarkerId, pointer: PixelPoint) {
        let Some(panel) = self.registry.get(id) else {
            tracing::debug!(marker = %id, "resize press on unknown panel, ignoring");
            return;
        };
        let size = panel.size;
        let effects = self.gestures.resize_down(id.clone(), pointer, size);
        self.apply_effects(effects);
    }

    /// Pointer moved during a resize.
    pub fn resize_move(&mut self, id: &MarkerId, pointer: PixelPoint, aspect_locked: bool) {
        let effects = self.gestures.resize_move(id, pointer, aspect_locked);
        self.apply_effects(effects);
    }

    /// Pointer released from a resize; commits the size.
    pub fn resize_up(&mut self, id: &MarkerId, pointer: PixelPoint, aspect_locked: bool) {
        let effects = self.gestures.resize_up(id, pointer, aspect_locked);
        self.apply_effects(effects);
    }

    fn apply_effects(&mut self, effects: Vec<GestureEffect>) {
        for effect in effects {
            match effect {
                GestureEffect::DisablePanning => self.provider.set_panning_enabled(false),
                GestureEffect::EnablePanning => self.provider.set_panning_enabled(true),
                GestureEffect::PanelMoved { id, position } => {
                    self.tether.set_drag_override(id, position);
                    self.refresh_tethers();
                }
                GestureEffect::CommitPosition { id, position } => {
                    let committed = self
                        .viewport()
                        .and_then(|viewport| to_geo(position, &viewport).ok());
                    match committed {
                        Some(geo) => self.registry.set_floating(&id, geo),
                        None => tracing::warn!(
                            marker = %id,
                            "projection unavailable at drag commit, keeping last position"
                        ),
                    }
                    self.tether.clear_drag_override(&id);
                    self.refresh_tethers();
                }
                GestureEffect::PanelResized { .. } => self.refresh_tethers(),
                GestureEffect::CommitSize { id, size } => {
                    self.registry.set_size(&id, size);
                    self.refresh_tethers();
                }
            }
        }
    }

    /// Panels eligible for arrangement: open and not mid-gesture.
    fn arrange_items(&self) -> Vec<ArrangeItem> {
        let minimized_height = self.config.minimized_height_px;
        self.registry
            .iter()
            .filter(|(id, _)| !self.gestures.is_active(*id))
            .map(|(id, panel)| ArrangeItem {
                id: id.clone(),
                anchor: panel.anchor,
                size: panel.effective_size(minimized_height),
            })
            .collect()
    }

    /// Arrange open panels radially around the viewport center.
    ///
    /// Returns false (and changes nothing) when the viewport is not ready;
    /// the call is safe to retry.
    pub fn arrange_radial(&mut self) -> bool {
        let Some(viewport) = self.viewport() else {
            return false;
        };
        let items = self.arrange_items();
        match radial_plan(&items, &viewport, self.config.radial_radius_fraction) {
            Ok(plan) => {
                let count = plan.len();
                self.registry.bulk_set_floating(plan);
                self.refresh_tethers();
                tracing::debug!(panels = count, "applied radial arrangement");
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "radial arrangement deferred");
                false
            }
        }
    }

    /// Arrange open panels along their nearest viewport edges, minimizing
    /// tether crossings greedily.
    ///
    /// Returns false (and changes nothing) when the viewport is not ready;
    /// the call is safe to retry.
    pub fn arrange_edges(&mut self) -> bool {
        let Some(viewport) = self.viewport() else {
            return false;
        };
        let items = self.arrange_items();
        match edge_plan(
            &items,
            &viewport,
            self.config.edge_margin_px,
            self.config.crossing_check_limit,
        ) {
            Ok(plan) => {
                let count = plan.len();
                self.registry
                    .bulk_set_floating(plan.into_iter().map(|p| (p.id, p.position)));
                self.refresh_tethers();
                tracing::debug!(panels = count, "applied edge arrangement");
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "edge arrangement deferred");
                false
            }
        }
    }

    /// Save the current registry, viewport, and filters as a named
    /// snapshot. Returns `None` when the viewport is not ready.
    pub fn save_snapshot(&mut self, title: impl Into<String>, timestamp_ms: u64) -> Option<SnapshotId> {
        let viewport = self.viewport()?;
        Some(self.snapshots.save(
            title,
            &self.registry,
            viewport.center,
            viewport.zoom,
            self.category_filters.clone(),
            timestamp_ms,
        ))
    }

    /// Restore a snapshot: the registry is replaced wholesale, filters are
    /// re-applied, and tethers for panels that no longer exist are removed.
    pub fn restore_snapshot(&mut self, id: SnapshotId) -> Result<(), SnapshotError> {
        let previous_ids: Vec<MarkerId> =
            self.registry.iter().map(|(id, _)| id.clone()).collect();
        let filters = {
            let snapshot = self.snapshots.restore(id, &mut self.registry)?;
            snapshot.active_category_filters.clone()
        };
        self.category_filters = filters;
        self.gestures.clear();
        for stale in previous_ids {
            if !self.registry.has(&stale) {
                self.tether.remove(&stale, self.surface.as_mut());
            }
        }
        self.refresh_tethers();
        Ok(())
    }

    /// Rename a saved snapshot.
    pub fn rename_snapshot(&mut self, id: SnapshotId, title: impl Into<String>) -> bool {
        self.snapshots.rename(id, title)
    }

    /// Delete a saved snapshot.
    pub fn delete_snapshot(&mut self, id: SnapshotId) -> bool {
        self.snapshots.delete(id)
    }

    /// Write panels, filters, and snapshots to the store.
    pub fn persist(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store_panels(store, &self.registry)?;
        store_filters(store, &self.category_filters)?;
        store_snapshots(store, &self.snapshots)
    }

    /// Load panels, filters, and snapshots from the store, replacing the
    /// live state. Corrupted payloads load as defaults.
    pub fn load(&mut self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        let previous_ids: Vec<MarkerId> =
            self.registry.iter().map(|(id, _)| id.clone()).collect();
        self.registry = load_panels(store)?;
        self.category_filters = load_filters(store)?;
        self.snapshots = load_snapshots(store, self.config.max_snapshots)?;
        self.gestures.clear();
        for stale in previous_ids {
            if !self.registry.has(&stale) {
                self.tether.remove(&stale, self.surface.as_mut());
            }
        }
        self.refresh_tethers();
        Ok(())
    }

    /// Tear down: drop all subscriptions, stop redraw loops, and give the
    /// pointer stream back to the map.
    pub fn dismount(&mut self) {
        tracing::debug!("dismounting overlay engine");
        self.hub.clear();
        self.zoom_driver.cancel();
        self.provider.set_panning_enabled(true);
    }
}
