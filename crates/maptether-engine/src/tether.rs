#![forbid(unsafe_code)]

//! Tether rendering: the line connecting each marker to its panel.
//!
//! Not a state machine — a reactive recomputation. Every relevant viewport
//! event (bounds/zoom/center change, continuous drag frames, drag end,
//! idle) triggers [`TetherRenderer::refresh`], which reprojects both
//! endpoints and pushes the segment's transform to the host surface.
//!
//! During an active panel drag the panel already tracks the pointer, so the
//! renderer takes a pixel-space override for that panel instead of its
//! registry position: the tether keeps following the pointer every frame
//! and never visually detaches, while `floating_position` stays untouched
//! until the gesture commits.
//!
//! # Failure Modes
//!
//! - Projection unavailable: `refresh` returns the error untouched; the
//!   engine defers and retries on the next viewport-idle event. Nothing is
//!   partially drawn — the first failed projection aborts the pass.

use maptether_core::geo::PixelPoint;
use maptether_core::project::{ProjectionError, to_pixel};
use maptether_core::viewport::ViewportState;
use rustc_hash::FxHashMap;
use web_time::{Duration, Instant};

use crate::registry::{MarkerId, PanelRegistry};

/// Screen-space geometry of one tether line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetherGeometry {
    /// Marker endpoint in viewport pixels.
    pub marker: PixelPoint,
    /// Panel endpoint in viewport pixels.
    pub panel: PixelPoint,
    /// Segment length in pixels.
    pub length_px: f64,
    /// Angle from marker to panel, radians from positive x.
    pub angle_rad: f64,
}

impl TetherGeometry {
    /// Derive length and angle from the two endpoints.
    #[must_use]
    pub fn between(marker: PixelPoint, panel: PixelPoint) -> Self {
        let delta = marker.delta_to(panel);
        Self {
            marker,
            panel,
            length_px: delta.length(),
            angle_rad: delta.dy.atan2(delta.dx),
        }
    }
}

/// Host-side drawing surface for tethers.
///
/// The engine pushes one transform per open panel; the host applies it to
/// whatever primitive it draws lines with.
pub trait TetherSurface {
    /// Create or update the tether for `id`.
    fn apply(&mut self, id: &MarkerId, tether: &TetherGeometry);
    /// Remove the tether for a closed panel.
    fn remove(&mut self, id: &MarkerId);
}

/// Recomputes tether geometry from the registry and the current viewport.
#[derive(Debug, Default)]
pub struct TetherRenderer {
    /// Pixel-space panel positions for panels mid-drag, keyed by id.
    drag_overrides: FxHashMap<MarkerId, PixelPoint>,
}

impl TetherRenderer {
    /// Create a renderer with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a panel's tether endpoint to a pixel position for the duration
    /// of a drag.
    pub fn set_drag_override(&mut self, id: MarkerId, position: PixelPoint) {
        self.drag_overrides.insert(id, position);
    }

    /// Release a drag override after the gesture commits or cancels.
    pub fn clear_drag_override(&mut self, id: &MarkerId) {
        self.drag_overrides.remove(id);
    }

    /// Recompute and push every tether.
    ///
    /// Cosmetic and idempotent: safe to run on every frame of a pan or
    /// zoom. Never writes panel state.
    pub fn refresh(
        &self,
        registry: &PanelRegistry,
        viewport: &ViewportState,
        surface: &mut dyn TetherSurface,
    ) -> Result<(), ProjectionError> {
        for (id, panel) in registry.iter() {
            let marker_px = to_pixel(panel.anchor, viewport)?;
            let panel_px = match self.drag_overrides.get(id) {
                Some(pinned) => *pinned,
                None => to_pixel(panel.floating_position, viewport)?,
            };
            let geometry = TetherGeometry::between(marker_px, panel_px);
            tracing::trace!(
                marker = %id,
                length_px = geometry.length_px,
                "tether refreshed"
            );
            surface.apply(id, &geometry);
        }
        Ok(())
    }

    /// Drop a closed panel's tether from the surface and any override.
    pub fn remove(&mut self, id: &MarkerId, surface: &mut dyn TetherSurface) {
        self.drag_overrides.remove(id);
        surface.remove(id);
    }
}

/// Drives frame-cadence tether redraws through a zoom gesture.
///
/// The host map keeps animating for a short window after the zoom gesture
/// ends, so redraws continue until a settle deadline passes. The stop
/// condition is explicit state — an active flag plus the deadline — never a
/// frame count, so an interrupted gesture cannot leave the loop running
/// forever; [`cancel`](Self::cancel) clears both at once.
#[derive(Debug)]
pub struct ZoomRedrawDriver {
    settle: Duration,
    zooming: bool,
    settle_until: Option<Instant>,
}

impl ZoomRedrawDriver {
    /// Create a driver with the given post-zoom settle window.
    #[must_use]
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            zooming: false,
            settle_until: None,
        }
    }

    /// A zoom gesture began.
    pub fn on_zoom_start(&mut self) {
        self.zooming = true;
        self.settle_until = None;
    }

    /// The zoom gesture ended; keep redrawing until `now + settle`.
    pub fn on_zoom_end(&mut self, now: Instant) {
        self.zooming = false;
        self.settle_until = Some(now + self.settle);
    }

    /// Whether a redraw should run this frame.
    #[must_use]
    pub fn is_active(&self, now: Instant) -> bool {
        if self.zooming {
            return true;
        }
        match self.settle_until {
            Some(deadline) => now < deadline,
            None => false,
        }
    }

    /// Stop immediately, discarding any pending settle window.
    pub fn cancel(&mut self) {
        self.zooming = false;
        self.settle_until = None;
    }
}
