#![forbid(unsafe_code)]

//! Viewport state and the host-map dependency-injection seam.
//!
//! The engine never reaches for an ambient map object. Every component that
//! needs projection or bounds receives a [`ViewportProvider`], so the whole
//! engine runs against a stub in tests.

use std::fmt;

use crate::geo::GeoPoint;

/// Read-only description of the host map's visible area.
///
/// Supplied by the host widget and treated as external state that changes
/// asynchronously (pan, zoom, resize). The engine never mutates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Geographic point at the viewport center.
    pub center: GeoPoint,
    /// Host map zoom level; fractional zooms are valid.
    pub zoom: f64,
    /// Viewport width in pixels.
    pub width_px: f64,
    /// Viewport height in pixels.
    pub height_px: f64,
}

impl ViewportState {
    /// Create a new viewport description.
    #[must_use]
    pub const fn new(center: GeoPoint, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center,
            zoom,
            width_px,
            height_px,
        }
    }

    /// Whether a projection can be derived from this viewport.
    ///
    /// During initial load the host map reports zero dimensions (or a
    /// negative/non-finite zoom); projection work must be deferred until
    /// this returns true.
    #[must_use]
    pub fn is_projectable(&self) -> bool {
        self.zoom >= 0.0
            && self.zoom.is_finite()
            && self.width_px > 0.0
            && self.height_px > 0.0
            && self.width_px.is_finite()
            && self.height_px.is_finite()
            && self.center.is_finite()
    }

    /// Shorter of the two pixel dimensions.
    #[inline]
    #[must_use]
    pub fn min_dimension(&self) -> f64 {
        self.width_px.min(self.height_px)
    }
}

/// Global viewport gesture the host map is currently performing.
///
/// Replaces the scattered `is_zooming` / `is_map_dragging` booleans the
/// engine would otherwise accumulate: there is exactly one mode, queried
/// wherever the answer matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportGesture {
    /// No viewport gesture in progress.
    #[default]
    Idle,
    /// The map itself is being dragged.
    Panning,
    /// A zoom gesture (or its settle animation) is in progress.
    Zooming,
}

/// Errors surfaced by a [`ViewportProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportError {
    /// The map has no current bounds (not yet rendered or mid-teardown).
    /// Callers short-circuit to a no-op and retry on the next idle event.
    BoundsUnavailable,
}

impl fmt::Display for ViewportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundsUnavailable => write!(f, "viewport bounds unavailable"),
        }
    }
}

impl std::error::Error for ViewportError {}

/// The host map widget, as the engine sees it.
///
/// Implemented by the real map adapter in production and by a stub in
/// tests. The engine requires only three things from the host: the current
/// viewport, the ability to arbitrate drag-gesture ownership, and delivery
/// of viewport events (which arrive through the engine's event entry point
/// rather than through this trait).
pub trait ViewportProvider {
    /// Current viewport, or [`ViewportError::BoundsUnavailable`] when the
    /// map is not ready.
    fn viewport(&self) -> Result<ViewportState, ViewportError>;

    /// Temporarily disable or re-enable map-level panning.
    ///
    /// Called on panel drag start/end so the map and the panel never fight
    /// over the same pointer stream.
    fn set_panning_enabled(&mut self, enabled: bool);
}

#[cfg(test)]
mod tests {
    use super::{ViewportGesture, ViewportState};
    use crate::geo::GeoPoint;

    #[test]
    fn fresh_viewport_is_projectable() {
        let vp = ViewportState::new(GeoPoint::new(10.0, 20.0), 12.0, 1024.0, 768.0);
        assert!(vp.is_projectable());
    }

    #[test]
    fn degenerate_viewports_are_not_projectable() {
        let center = GeoPoint::new(0.0, 0.0);
        assert!(!ViewportState::new(center, 12.0, 0.0, 768.0).is_projectable());
        assert!(!ViewportState::new(center, 12.0, 1024.0, 0.0).is_projectable());
        assert!(!ViewportState::new(center, -1.0, 1024.0, 768.0).is_projectable());
        assert!(!ViewportState::new(center, f64::NAN, 1024.0, 768.0).is_projectable());
        let bad_center = GeoPoint::new(f64::NAN, 0.0);
        assert!(!ViewportState::new(bad_center, 12.0, 1024.0, 768.0).is_projectable());
    }

    #[test]
    fn gesture_defaults_to_idle() {
        assert_eq!(ViewportGesture::default(), ViewportGesture::Idle);
    }

    #[test]
    fn min_dimension_picks_shorter_side() {
        let vp = ViewportState::new(GeoPoint::default(), 10.0, 1000.0, 800.0);
        assert_eq!(vp.min_dimension(), 800.0);
    }
}
