#![forbid(unsafe_code)]

//! Geographic and pixel-space value types.
//!
//! All four types are small `Copy` values. `GeoPoint` is the persisted
//! representation; pixel-space values are always derived from the current
//! viewport and never stored.

use serde::{Deserialize, Serialize};

/// A WGS84-style geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    #[inline]
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A viewport-relative screen coordinate in pixels, origin at top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    /// Create a new pixel point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by a pixel delta.
    #[inline]
    #[must_use]
    pub fn offset(&self, delta: PixelVec) -> Self {
        Self {
            x: self.x + delta.dx,
            y: self.y + delta.dy,
        }
    }

    /// Vector from `self` to `other`.
    #[inline]
    #[must_use]
    pub fn delta_to(&self, other: PixelPoint) -> PixelVec {
        PixelVec {
            dx: other.x - self.x,
            dy: other.y - self.y,
        }
    }
}

/// A pixel-space displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelVec {
    pub dx: f64,
    pub dy: f64,
}

impl PixelVec {
    /// Create a new pixel delta.
    #[inline]
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Euclidean length in pixels.
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Manhattan length in pixels; cheap drag-threshold test.
    #[inline]
    #[must_use]
    pub fn manhattan(&self) -> f64 {
        self.dx.abs() + self.dy.abs()
    }
}

/// A pixel-space extent (panel dimensions).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

impl PixelSize {
    /// Create a new pixel extent.
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Half-extents, used for center-anchored bounds math.
    #[inline]
    #[must_use]
    pub fn half(&self) -> PixelVec {
        PixelVec {
            dx: self.width / 2.0,
            dy: self.height / 2.0,
        }
    }

    /// True when either dimension is non-positive.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Width-to-height ratio, used by aspect-locked resizing.
    ///
    /// Returns 1.0 for degenerate heights so callers never divide by zero.
    #[inline]
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoPoint, PixelPoint, PixelSize, PixelVec};

    #[test]
    fn pixel_offset_translates() {
        let p = PixelPoint::new(10.0, 20.0);
        let moved = p.offset(PixelVec::new(5.0, -3.0));
        assert_eq!(moved, PixelPoint::new(15.0, 17.0));
    }

    #[test]
    fn delta_to_is_directed() {
        let a = PixelPoint::new(1.0, 1.0);
        let b = PixelPoint::new(4.0, 5.0);
        let d = a.delta_to(b);
        assert_eq!(d, PixelVec::new(3.0, 4.0));
        assert_eq!(d.length(), 5.0);
        assert_eq!(d.manhattan(), 7.0);
    }

    #[test]
    fn size_half_extents() {
        let s = PixelSize::new(260.0, 180.0);
        let h = s.half();
        assert_eq!(h.dx, 130.0);
        assert_eq!(h.dy, 90.0);
    }

    #[test]
    fn degenerate_size_is_empty() {
        assert!(PixelSize::new(0.0, 10.0).is_empty());
        assert!(PixelSize::new(10.0, -1.0).is_empty());
        assert!(!PixelSize::new(1.0, 1.0).is_empty());
    }

    #[test]
    fn aspect_ratio_guards_zero_height() {
        assert_eq!(PixelSize::new(200.0, 100.0).aspect_ratio(), 2.0);
        assert_eq!(PixelSize::new(200.0, 0.0).aspect_ratio(), 1.0);
    }

    #[test]
    fn geo_point_finite_check() {
        assert!(GeoPoint::new(12.5, -70.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_finite());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn geo_point_serde_round_trip() {
        let p = GeoPoint::new(-33.87, 151.21);
        let json = serde_json::to_string(&p).unwrap();
        let back: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
