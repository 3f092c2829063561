#![forbid(unsafe_code)]

//! Overlap and intersection oracle.
//!
//! Pure predicates consumed by the arrangement strategies: box overlap,
//! overlap area, segment intersection, and pairwise crossing counts.
//! Segments live in the geographic plane (x = longitude, y = latitude);
//! every comparison stays within that one space, so no projection is
//! involved here.

use crate::bounds::GeoBounds;
use crate::constants::PARALLEL_EPSILON;
use crate::geo::GeoPoint;

/// Whether two boxes overlap with positive area.
///
/// Boxes that merely touch along an edge (zero-width intersection) do not
/// overlap.
#[inline]
#[must_use]
pub fn overlaps(a: &GeoBounds, b: &GeoBounds) -> bool {
    overlap_area(a, b) > 0.0
}

/// Area of the intersection of two boxes, in degree².
///
/// Zero when the boxes are disjoint or touch only along an edge. Used as
/// the ranking signal by the overlap-avoidance fallback.
#[must_use]
pub fn overlap_area(a: &GeoBounds, b: &GeoBounds) -> f64 {
    let width = a.east.min(b.east) - a.west.max(b.west);
    let height = a.north.min(b.north) - a.south.max(b.south);
    if width > 0.0 && height > 0.0 {
        width * height
    } else {
        0.0
    }
}

/// Whether segment `p1→p2` intersects segment `q1→q2`.
///
/// Parametric form: solve `p1 + t·r = q1 + u·s` for `t, u` and accept when
/// both lie in `[0, 1]`. Parallel or near-parallel segments (determinant
/// magnitude below [`PARALLEL_EPSILON`]) are treated as non-intersecting —
/// collinear overlap never arises from distinct tethers in practice, and
/// treating it as a crossing would only inflate the diagnostic count.
#[must_use]
pub fn segments_intersect(p1: GeoPoint, p2: GeoPoint, q1: GeoPoint, q2: GeoPoint) -> bool {
    let rx = p2.lng - p1.lng;
    let ry = p2.lat - p1.lat;
    let sx = q2.lng - q1.lng;
    let sy = q2.lat - q1.lat;

    let det = rx * sy - ry * sx;
    if det.abs() < PARALLEL_EPSILON {
        return false;
    }

    let qpx = q1.lng - p1.lng;
    let qpy = q1.lat - p1.lat;
    let t = (qpx * sy - qpy * sx) / det;
    let u = (qpx * ry - qpy * rx) / det;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Pairwise crossing count over all `C(n, 2)` segment pairs.
///
/// A diagnostic/optimization signal, not a correctness gate; the edge
/// arrangement strategy skips crossing checks entirely above its cutoff
/// and falls back to nearest-edge-only placement.
#[must_use]
pub fn count_crossings(segments: &[(GeoPoint, GeoPoint)]) -> usize {
    let mut crossings = 0;
    for (i, (a1, a2)) in segments.iter().enumerate() {
        for (b1, b2) in &segments[i + 1..] {
            if segments_intersect(*a1, *a2, *b1, *b2) {
                crossings += 1;
            }
        }
    }
    crossings
}
