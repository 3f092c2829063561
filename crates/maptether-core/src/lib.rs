#![forbid(unsafe_code)]

//! Core: geographic/pixel value types, projection, and overlap predicates.
//!
//! # Role in maptether
//! `maptether-core` is the pure geometry layer. It owns the value types the
//! engine trades in (`GeoPoint`, `PixelPoint`, `PixelSize`), the Web Mercator
//! coordinate bridge, panel bounds computation, and the overlap/intersection
//! oracle. Nothing in this crate holds state: every function is a total,
//! deterministic map from inputs to outputs (or a typed error when the host
//! viewport is not ready).
//!
//! # Primary responsibilities
//! - **Coordinate bridge**: geo ↔ viewport-pixel conversion from the current
//!   center, zoom, and pixel size.
//! - **Bounds**: axis-aligned geographic boxes for panels and the viewport,
//!   so overlap tests survive pan/zoom without per-frame recomputation.
//! - **Oracle**: box overlap, segment intersection, pairwise crossing counts.
//! - **ViewportProvider**: the dependency-injection seam standing in for the
//!   host map widget, so the engine is testable without a real map.
//!
//! # How it fits in the system
//! The engine crate (`maptether-engine`) layers panel state, gestures, and
//! arrangement strategies on top. It calls into this crate for every
//! conversion and predicate, and never duplicates the math.

pub mod bounds;
pub mod constants;
pub mod geo;
pub mod intersect;
pub mod project;
pub mod viewport;

pub use bounds::{GeoBounds, panel_bounds, viewport_bounds};
pub use geo::{GeoPoint, PixelPoint, PixelSize, PixelVec};
pub use intersect::{count_crossings, overlap_area, overlaps, segments_intersect};
pub use project::{ProjectionError, pixel_delta_to_geo, to_geo, to_pixel};
pub use viewport::{ViewportError, ViewportGesture, ViewportProvider, ViewportState};
