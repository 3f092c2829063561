#![forbid(unsafe_code)]

//! Engine-wide magic numbers, following common web-map conventions.
//! Keeping them in a single place makes the projection math auditable.

/// Square tile edge in pixels; the Web Mercator world is one tile at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude clamp for Web Mercator; the projection diverges at the poles.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Determinant magnitude below which two segments are treated as parallel
/// (and therefore non-intersecting) by the oracle.
pub const PARALLEL_EPSILON: f64 = 1e-10;
