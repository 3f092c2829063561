#![forbid(unsafe_code)]

//! Coordinate bridge: Web Mercator geo ↔ viewport-pixel conversion.
//!
//! Both directions are pure functions of a [`ViewportState`]. The world is
//! a square of `TILE_SIZE * 2^zoom` pixels; a viewport pixel is the world
//! pixel shifted so the viewport center lands at `(width/2, height/2)`.
//!
//! # Invariants
//!
//! 1. `to_geo(to_pixel(p, v), v)` round-trips within 1e-6 degrees for any
//!    point inside the viewport of a projectable `v`.
//! 2. `to_pixel(v.center, v)` is exactly the viewport's pixel center.
//! 3. A non-projectable viewport yields [`ProjectionError::Unavailable`];
//!    neither direction ever panics.

use std::f64::consts::PI;
use std::fmt;

use crate::constants::{MAX_LATITUDE, TILE_SIZE};
use crate::geo::{GeoPoint, PixelPoint, PixelVec};
use crate::viewport::ViewportState;

/// Errors from the coordinate bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionError {
    /// No projection can be derived from the viewport (degenerate size or
    /// zoom, e.g. during initial load). Callers defer and retry on the next
    /// viewport-idle event; this condition is never surfaced to the user.
    Unavailable {
        zoom: f64,
        width_px: f64,
        height_px: f64,
    },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable {
                zoom,
                width_px,
                height_px,
            } => write!(
                f,
                "projection unavailable: zoom {zoom}, viewport {width_px}x{height_px}"
            ),
        }
    }
}

impl std::error::Error for ProjectionError {}

/// World edge length in pixels at the given zoom.
#[inline]
#[must_use]
fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Project a geographic point onto the world-pixel plane.
fn world_from_geo(geo: GeoPoint, world: f64) -> (f64, f64) {
    let lat = geo.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = (geo.lng + 180.0) / 360.0 * world;
    let sin_y = (lat.to_radians()).sin();
    let y = (0.5 - ((1.0 + sin_y) / (1.0 - sin_y)).ln() / (4.0 * PI)) * world;
    (x, y)
}

/// Unproject a world-pixel position back to a geographic point.
fn geo_from_world(x: f64, y: f64, world: f64) -> GeoPoint {
    let lng = x / world * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / world);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), lng)
}

fn require_projectable(viewport: &ViewportState) -> Result<(), ProjectionError> {
    if viewport.is_projectable() {
        Ok(())
    } else {
        Err(ProjectionError::Unavailable {
            zoom: viewport.zoom,
            width_px: viewport.width_px,
            height_px: viewport.height_px,
        })
    }
}

/// Convert a geographic point to viewport-relative pixels.
pub fn to_pixel(geo: GeoPoint, viewport: &ViewportState) -> Result<PixelPoint, ProjectionError> {
    require_projectable(viewport)?;
    let world = world_size(viewport.zoom);
    let (wx, wy) = world_from_geo(geo, world);
    let (cx, cy) = world_from_geo(viewport.center, world);
    Ok(PixelPoint::new(
        wx - cx + viewport.width_px / 2.0,
        wy - cy + viewport.height_px / 2.0,
    ))
}

/// Convert a viewport-relative pixel position to a geographic point.
pub fn to_geo(pixel: PixelPoint, viewport: &ViewportState) -> Result<GeoPoint, ProjectionError> {
    require_projectable(viewport)?;
    let world = world_size(viewport.zoom);
    let (cx, cy) = world_from_geo(viewport.center, world);
    let wx = pixel.x - viewport.width_px / 2.0 + cx;
    let wy = pixel.y - viewport.height_px / 2.0 + cy;
    Ok(geo_from_world(wx, wy, world))
}

/// Translate a geographic point by a pixel delta at the current zoom.
///
/// The single conversion call used wherever "N pixels in geographic units"
/// appears: project, offset, unproject. Exact under Mercator's latitude
/// nonlinearity, unlike a degrees-per-pixel approximation.
pub fn pixel_delta_to_geo(
    origin: GeoPoint,
    delta: PixelVec,
    viewport: &ViewportState,
) -> Result<GeoPoint, ProjectionError> {
    let px = to_pixel(origin, viewport)?;
    to_geo(px.offset(delta), viewport)
}

#[cfg(test)]
mod tests {
    use super::{ProjectionError, to_geo, to_pixel};
    use crate::geo::{GeoPoint, PixelPoint, PixelVec};
    use crate::project::pixel_delta_to_geo;
    use crate::viewport::ViewportState;
    use proptest::prelude::*;

    fn viewport() -> ViewportState {
        ViewportState::new(GeoPoint::new(37.77, -122.42), 12.0, 1000.0, 800.0)
    }

    #[test]
    fn center_projects_to_pixel_center() {
        let vp = viewport();
        let px = to_pixel(vp.center, &vp).unwrap();
        assert!((px.x - 500.0).abs() < 1e-9);
        assert!((px.y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_center_unprojects_to_center() {
        let vp = viewport();
        let geo = to_geo(PixelPoint::new(500.0, 400.0), &vp).unwrap();
        assert!((geo.lat - vp.center.lat).abs() < 1e-9);
        assert!((geo.lng - vp.center.lng).abs() < 1e-9);
    }

    #[test]
    fn east_is_positive_x_north_is_negative_y() {
        let vp = viewport();
        let east = to_pixel(GeoPoint::new(vp.center.lat, vp.center.lng + 0.01), &vp).unwrap();
        let north = to_pixel(GeoPoint::new(vp.center.lat + 0.01, vp.center.lng), &vp).unwrap();
        assert!(east.x > 500.0);
        assert!(north.y < 400.0);
    }

    #[test]
    fn degenerate_viewport_is_an_error_not_a_panic() {
        let vp = ViewportState::new(GeoPoint::default(), 12.0, 0.0, 0.0);
        let err = to_pixel(GeoPoint::new(1.0, 1.0), &vp).unwrap_err();
        assert!(matches!(err, ProjectionError::Unavailable { .. }));
        assert!(to_geo(PixelPoint::new(1.0, 1.0), &vp).is_err());
    }

    #[test]
    fn latitude_is_clamped_near_poles() {
        let vp = ViewportState::new(GeoPoint::default(), 3.0, 1000.0, 800.0);
        let px = to_pixel(GeoPoint::new(89.9, 0.0), &vp).unwrap();
        assert!(px.y.is_finite());
    }

    #[test]
    fn pixel_delta_moves_by_that_many_pixels() {
        let vp = viewport();
        let origin = vp.center;
        let moved = pixel_delta_to_geo(origin, PixelVec::new(50.0, 50.0), &vp).unwrap();
        let px = to_pixel(moved, &vp).unwrap();
        assert!((px.x - 550.0).abs() < 1e-6);
        assert!((px.y - 450.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn round_trip_stays_within_tolerance(
            lat in -80.0f64..80.0,
            lng in -179.0f64..179.0,
            zoom in 3.0f64..18.0,
            width in 200.0f64..2000.0,
            height in 200.0f64..2000.0,
            px_x in 0.0f64..1.0,
            px_y in 0.0f64..1.0,
        ) {
            let vp = ViewportState::new(GeoPoint::new(lat, lng), zoom, width, height);
            // A point inside the viewport, derived from pixels.
            let p = to_geo(PixelPoint::new(px_x * width, px_y * height), &vp).unwrap();
            let back = to_geo(to_pixel(p, &vp).unwrap(), &vp).unwrap();
            prop_assert!((back.lat - p.lat).abs() <= 1e-6);
            prop_assert!((back.lng - p.lng).abs() <= 1e-6);
        }

        #[test]
        fn pixel_round_trip_stays_within_tolerance(
            zoom in 3.0f64..18.0,
            px_x in 0.0f64..1000.0,
            px_y in 0.0f64..800.0,
        ) {
            let vp = ViewportState::new(GeoPoint::new(37.77, -122.42), zoom, 1000.0, 800.0);
            let geo = to_geo(PixelPoint::new(px_x, px_y), &vp).unwrap();
            let back = to_pixel(geo, &vp).unwrap();
            prop_assert!((back.x - px_x).abs() <= 1e-3);
            prop_assert!((back.y - px_y).abs() <= 1e-3);
        }
    }
}
