#![forbid(unsafe_code)]

//! Axis-aligned geographic boxes for panels and the viewport.
//!
//! Panel overlap tests run in geographic space so they survive pan and zoom
//! without per-frame recomputation from pixels. Bounds are derived values:
//! they are recomputed on demand and never cached across a zoom change,
//! because the pixel-to-geo extent of a panel is a function of the current
//! viewport.

use crate::geo::{GeoPoint, PixelPoint, PixelSize};
use crate::project::{ProjectionError, to_geo, to_pixel};
use crate::viewport::ViewportState;

/// An axis-aligned box in geographic space.
///
/// `north >= south` and `east >= west` for every box produced by this
/// module (antimeridian-spanning viewports are not supported by the host
/// map this engine targets).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center_lat: f64,
    pub center_lng: f64,
}

impl GeoBounds {
    /// Build a box from two corners, normalizing the edge order.
    #[must_use]
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        let north = a.lat.max(b.lat);
        let south = a.lat.min(b.lat);
        let east = a.lng.max(b.lng);
        let west = a.lng.min(b.lng);
        Self {
            north,
            south,
            east,
            west,
            center_lat: (north + south) / 2.0,
            center_lng: (east + west) / 2.0,
        }
    }

    /// Longitudinal extent in degrees.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal extent in degrees.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True when the box has no positive area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Whether a point lies inside the box (edges inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat <= self.north && p.lat >= self.south && p.lng >= self.west && p.lng <= self.east
    }
}

/// Geographic box occupied by a panel centered at `center` with the given
/// pixel dimensions.
///
/// `size` must be the panel's *current* dimensions — minimized panels
/// collapse to their minimized height, resized panels use the resized
/// value. Passing a stale size silently breaks overlap detection, which is
/// why callers resolve the effective size at the call site.
pub fn panel_bounds(
    center: GeoPoint,
    size: PixelSize,
    viewport: &ViewportState,
) -> Result<GeoBounds, ProjectionError> {
    let center_px = to_pixel(center, viewport)?;
    let half = size.half();
    let nw = to_geo(
        PixelPoint::new(center_px.x - half.dx, center_px.y - half.dy),
        viewport,
    )?;
    let se = to_geo(
        PixelPoint::new(center_px.x + half.dx, center_px.y + half.dy),
        viewport,
    )?;
    Ok(GeoBounds::from_corners(nw, se))
}

/// Geographic box covered by the viewport itself.
pub fn viewport_bounds(viewport: &ViewportState) -> Result<GeoBounds, ProjectionError> {
    let nw = to_geo(PixelPoint::new(0.0, 0.0), viewport)?;
    let se = to_geo(
        PixelPoint::new(viewport.width_px, viewport.height_px),
        viewport,
    )?;
    Ok(GeoBounds::from_corners(nw, se))
}
