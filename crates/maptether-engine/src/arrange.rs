#![forbid(unsafe_code)]

//! Automatic panel arrangement: radial, edge-aligned, and the
//! overlap-avoidance fallback for newly opened panels.
//!
//! All three planners are pure: registry-derived items plus a viewport in,
//! a set of floating positions out. The engine facade applies a plan
//! through `bulk_set_floating`, so planning never observes a half-mutated
//! registry and a plan for a panel that closed mid-flight is simply
//! skipped at application time.
//!
//! The edge strategy's crossing minimization is a greedy single pass:
//! each panel tests its candidate edges (nearest first) only against
//! tethers already committed earlier in the pass. That is deliberately not
//! a global minimum-crossing solver; the layout it produces is the layout
//! users of the original arrangement expect.

use maptether_core::bounds::{GeoBounds, panel_bounds, viewport_bounds};
use maptether_core::geo::{GeoPoint, PixelPoint, PixelSize, PixelVec};
use maptether_core::intersect::{overlap_area, segments_intersect};
use maptether_core::project::{ProjectionError, to_geo, to_pixel};
use maptether_core::viewport::ViewportState;
use smallvec::SmallVec;

use crate::registry::MarkerId;

/// One panel as the planners see it.
#[derive(Debug, Clone)]
pub struct ArrangeItem {
    pub id: MarkerId,
    /// The marker's geographic position (tethers originate here).
    pub anchor: GeoPoint,
    /// The panel's current effective dimensions.
    pub size: PixelSize,
}

/// A viewport edge a panel can be aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportEdge {
    North,
    South,
    East,
    West,
}

/// Edge-aligned placement for one panel.
#[derive(Debug, Clone)]
pub struct EdgePlacement {
    pub id: MarkerId,
    pub edge: ViewportEdge,
    pub position: GeoPoint,
}

/// Place `items` on a circle around the viewport center.
///
/// Radius is `radius_fraction` of the shorter viewport side; panel `k` of
/// `n` sits at angle `k·2π/n`. A single panel sits at the center itself.
/// An empty item set yields an empty plan.
pub fn radial_plan(
    items: &[ArrangeItem],
    viewport: &ViewportState,
    radius_fraction: f64,
) -> Result<Vec<(MarkerId, GeoPoint)>, ProjectionError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let center_px = PixelPoint::new(viewport.width_px / 2.0, viewport.height_px / 2.0);
    if items.len() == 1 {
        let center = to_geo(center_px, viewport)?;
        return Ok(vec![(items[0].id.clone(), center)]);
    }

    let radius = radius_fraction * viewport.min_dimension();
    let step = std::f64::consts::TAU / items.len() as f64;
    let mut plan = Vec::with_capacity(items.len());
    for (k, item) in items.iter().enumerate() {
        let angle = k as f64 * step;
        let px = PixelPoint::new(
            center_px.x + radius * angle.cos(),
            center_px.y + radius * angle.sin(),
        );
        plan.push((item.id.clone(), to_geo(px, viewport)?));
    }
    Ok(plan)
}

/// Clamp `value` into `[min, max]`, falling back to the midpoint when the
/// panel is too large for the span to exist.
fn clamp_or_mid(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        (min + max) / 2.0
    } else {
        value.clamp(min, max)
    }
}

/// Marker-aligned position near `edge`, inset by the margin plus half the
/// panel's own dimension so the panel body stays inside the viewport.
fn aligned_position(
    edge: ViewportEdge,
    marker_px: PixelPoint,
    half: PixelVec,
    viewport: &ViewportState,
    margin: f64,
) -> PixelPoint {
    let w = viewport.width_px;
    let h = viewport.height_px;
    match edge {
        ViewportEdge::North => PixelPoint::new(
            clamp_or_mid(marker_px.x, margin + half.dx, w - margin - half.dx),
            margin + half.dy,
        ),
        ViewportEdge::South => PixelPoint::new(
            clamp_or_mid(marker_px.x, margin + half.dx, w - margin - half.dx),
            h - margin - half.dy,
        ),
        ViewportEdge::West => PixelPoint::new(
            margin + half.dx,
            clamp_or_mid(marker_px.y, margin + half.dy, h - margin - half.dy),
        ),
        ViewportEdge::East => PixelPoint::new(
            w - margin - half.dx,
            clamp_or_mid(marker_px.y, margin + half.dy, h - margin - half.dy),
        ),
    }
}

/// Assign each panel to a viewport edge and distribute edge groups evenly.
///
/// Edge choice per panel: candidate edges ordered nearest-first from the
/// *marker* position; the first whose simulated tether adds zero crossings
/// against tethers committed earlier in the pass wins, else the nearest.
/// Above `crossing_check_limit` panels the crossing checks are skipped
/// entirely and every panel takes its nearest edge.
pub fn edge_plan(
    items: &[ArrangeItem],
    viewport: &ViewportState,
    margin_px: f64,
    crossing_check_limit: usize,
) -> Result<Vec<EdgePlacement>, ProjectionError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let check_crossings = items.len() <= crossing_check_limit;

    struct Assigned {
        item_index: usize,
        edge: ViewportEdge,
        marker_px: PixelPoint,
        half: PixelVec,
    }

    let mut assigned: Vec<Assigned> = Vec::with_capacity(items.len());
    let mut committed: Vec<(GeoPoint, GeoPoint)> = Vec::with_capacity(items.len());

    for (item_index, item) in items.iter().enumerate() {
        let marker_px = to_pixel(item.anchor, viewport)?;
        let half = item.size.half();

        let mut edges: SmallVec<[(ViewportEdge, f64); 4]> = SmallVec::from_slice(&[
            (ViewportEdge::North, marker_px.y),
            (ViewportEdge::South, viewport.height_px - marker_px.y),
            (ViewportEdge::West, marker_px.x),
            (ViewportEdge::East, viewport.width_px - marker_px.x),
        ]);
        edges.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut chosen = edges[0].0;
        let mut chosen_tether = None;
        if check_crossings {
            for (edge, _) in &edges {
                let candidate_px = aligned_position(*edge, marker_px, half, viewport, margin_px);
                let candidate_geo = to_geo(candidate_px, viewport)?;
                let crosses = committed
                    .iter()
                    .any(|(m, p)| segments_intersect(item.anchor, candidate_geo, *m, *p));
                if !crosses {
                    chosen = *edge;
                    chosen_tether = Some((item.anchor, candidate_geo));
                    break;
                }
            }
        }
        let tether = match chosen_tether {
            Some(t) => t,
            None => {
                let px = aligned_position(chosen, marker_px, half, viewport, margin_px);
                (item.anchor, to_geo(px, viewport)?)
            }
        };
        committed.push(tether);
        assigned.push(Assigned {
            item_index,
            edge: chosen,
            marker_px,
            half,
        });
    }

    // Distribute each edge group evenly along its edge, ordered by the
    // perpendicular marker coordinate (west-to-east along the horizontal
    // edges, north-to-south along the vertical ones).
    let mut plan = Vec::with_capacity(items.len());
    for edge in [
        ViewportEdge::North,
        ViewportEdge::South,
        ViewportEdge::East,
        ViewportEdge::West,
    ] {
        let mut group: Vec<&Assigned> = assigned.iter().filter(|a| a.edge == edge).collect();
        if group.is_empty() {
            continue;
        }
        if group.len() == 1 {
            let a = group[0];
            let px = aligned_position(edge, a.marker_px, a.half, viewport, margin_px);
            plan.push(EdgePlacement {
                id: items[a.item_index].id.clone(),
                edge,
                position: to_geo(px, viewport)?,
            });
            continue;
        }

        let horizontal = matches!(edge, ViewportEdge::North | ViewportEdge::South);
        group.sort_by(|a, b| {
            if horizontal {
                a.marker_px.x.total_cmp(&b.marker_px.x)
            } else {
                a.marker_px.y.total_cmp(&b.marker_px.y)
            }
        });
        let edge_len = if horizontal {
            viewport.width_px
        } else {
            viewport.height_px
        };
        let slots = group.len() as f64;
        for (slot, a) in group.iter().enumerate() {
            let (half_along, half_in) = if horizontal {
                (a.half.dx, a.half.dy)
            } else {
                (a.half.dy, a.half.dx)
            };
            let along = clamp_or_mid(
                (slot as f64 + 1.0) * edge_len / (slots + 1.0),
                margin_px + half_along,
                edge_len - margin_px - half_along,
            );
            let inset = margin_px + half_in;
            let px = match edge {
                ViewportEdge::North => PixelPoint::new(along, inset),
                ViewportEdge::South => PixelPoint::new(along, viewport.height_px - inset),
                ViewportEdge::West => PixelPoint::new(inset, along),
                ViewportEdge::East => PixelPoint::new(viewport.width_px - inset, along),
            };
            plan.push(EdgePlacement {
                id: items[a.item_index].id.clone(),
                edge,
                position: to_geo(px, viewport)?,
            });
        }
    }
    Ok(plan)
}

/// Nudge a proposed panel position away from existing panels.
///
/// Evaluates a fixed candidate set — the original point plus its
/// translation by the minimum-separation distance in the 4 cardinal and 4
/// diagonal directions — discards candidates outside the viewport, and
/// returns the candidate with the least total overlap area against
/// `others`. A zero-overlap candidate is accepted immediately; the original
/// point is evaluated first, so it wins all ties.
pub fn avoid_overlap(
    proposed: GeoPoint,
    size: PixelSize,
    others: &[GeoBounds],
    viewport: &ViewportState,
    min_separation_px: f64,
) -> Result<GeoPoint, ProjectionError> {
    let vp_bounds = viewport_bounds(viewport)?;
    let base_px = to_pixel(proposed, viewport)?;
    let s = min_separation_px;
    let offsets: SmallVec<[PixelVec; 9]> = SmallVec::from_slice(&[
        PixelVec::new(0.0, 0.0),
        PixelVec::new(0.0, -s),
        PixelVec::new(s, 0.0),
        PixelVec::new(0.0, s),
        PixelVec::new(-s, 0.0),
        PixelVec::new(s, -s),
        PixelVec::new(s, s),
        PixelVec::new(-s, s),
        PixelVec::new(-s, -s),
    ]);

    let mut best: Option<(GeoPoint, f64)> = None;
    for offset in offsets {
        let candidate = to_geo(base_px.offset(offset), viewport)?;
        if !vp_bounds.contains(candidate) {
            continue;
        }
        let bounds = panel_bounds(candidate, size, viewport)?;
        let total: f64 = others.iter().map(|o| overlap_area(&bounds, o)).sum();
        if total == 0.0 {
            return Ok(candidate);
        }
        if best.is_none_or(|(_, area)| total < area) {
            best = Some((candidate, total));
        }
    }
    Ok(best.map_or(proposed, |(p, _)| p))
}

#[cfg(test)]
mod tests {
    use super::{ArrangeItem, ViewportEdge, avoid_overlap, edge_plan, radial_plan};
    use maptether_core::bounds::panel_bounds;
    use maptether_core::geo::{GeoPoint, PixelPoint, PixelSize};
    use maptether_core::intersect::{count_crossings, overlap_area, overlaps};
    use maptether_core::project::{to_geo, to_pixel};
    use maptether_core::viewport::ViewportState;

    const SIZE: PixelSize = PixelSize::new(260.0, 180.0);
    const MARGIN: f64 = 10.0;

    fn viewport() -> ViewportState {
        ViewportState::new(GeoPoint::new(37.77, -122.42), 12.0, 1000.0, 800.0)
    }

    fn item(id: &str, px: PixelPoint, vp: &ViewportState) -> ArrangeItem {
        ArrangeItem {
            id: id.into(),
            anchor: to_geo(px, vp).unwrap(),
            size: SIZE,
        }
    }

    #[test]
    fn radial_of_none_is_empty() {
        let vp = viewport();
        assert!(radial_plan(&[], &vp, 0.3).unwrap().is_empty());
    }

    #[test]
    fn radial_of_one_is_the_viewport_center() {
        let vp = viewport();
        let items = vec![item("m1", PixelPoint::new(100.0, 100.0), &vp)];
        let plan = radial_plan(&items, &vp, 0.3).unwrap();
        assert_eq!(plan.len(), 1);
        let px = to_pixel(plan[0].1, &vp).unwrap();
        assert!((px.x - 500.0).abs() < 1e-6);
        assert!((px.y - 400.0).abs() < 1e-6);
    }

    #[test]
    fn radial_spaces_panels_at_equal_angles_on_the_radius() {
        let vp = viewport();
        let items: Vec<ArrangeItem> = (0..4)
            .map(|i| item(&format!("m{i}"), PixelPoint::new(500.0, 400.0), &vp))
            .collect();
        let plan = radial_plan(&items, &vp, 0.3).unwrap();
        assert_eq!(plan.len(), 4);
        let radius = 0.3 * 800.0;
        for (k, (_, geo)) in plan.iter().enumerate() {
            let px = to_pixel(*geo, &vp).unwrap();
            let dx = px.x - 500.0;
            let dy = px.y - 400.0;
            assert!((dx.hypot(dy) - radius).abs() < 1e-6, "panel {k} off radius");
        }
        // First panel sits due east of center.
        let first = to_pixel(plan[0].1, &vp).unwrap();
        assert!((first.x - (500.0 + radius)).abs() < 1e-6);
        assert!((first.y - 400.0).abs() < 1e-6);
    }

    #[test]
    fn edge_plan_assigns_distinct_edges_for_a_spanning_triangle() {
        let vp = viewport();
        let items = vec![
            item("top", PixelPoint::new(500.0, 60.0), &vp),
            item("left", PixelPoint::new(70.0, 400.0), &vp),
            item("bottomright", PixelPoint::new(930.0, 720.0), &vp),
        ];
        let plan = edge_plan(&items, &vp, MARGIN, 50).unwrap();
        assert_eq!(plan.len(), 3);
        let edges: std::collections::HashSet<ViewportEdge> =
            plan.iter().map(|p| p.edge).collect();
        assert_eq!(edges.len(), 3, "expected three distinct edges: {plan:?}");
    }

    #[test]
    fn edge_plan_keeps_panel_bodies_inside_the_viewport() {
        let vp = viewport();
        let items = vec![
            item("a", PixelPoint::new(20.0, 20.0), &vp),
            item("b", PixelPoint::new(980.0, 20.0), &vp),
            item("c", PixelPoint::new(20.0, 780.0), &vp),
            item("d", PixelPoint::new(980.0, 780.0), &vp),
        ];
        let plan = edge_plan(&items, &vp, MARGIN, 50).unwrap();
        for placement in &plan {
            let px = to_pixel(placement.position, &vp).unwrap();
            assert!(px.x - SIZE.width / 2.0 >= MARGIN - 1e-6, "{placement:?}");
            assert!(px.x + SIZE.width / 2.0 <= vp.width_px - MARGIN + 1e-6);
            assert!(px.y - SIZE.height / 2.0 >= MARGIN - 1e-6);
            assert!(px.y + SIZE.height / 2.0 <= vp.height_px - MARGIN + 1e-6);
        }
    }

    #[test]
    fn edge_plan_quadrant_markers_produce_zero_crossings() {
        let vp = viewport();
        let items = vec![
            item("nw", PixelPoint::new(250.0, 200.0), &vp),
            item("ne", PixelPoint::new(750.0, 200.0), &vp),
            item("sw", PixelPoint::new(250.0, 600.0), &vp),
            item("se", PixelPoint::new(750.0, 600.0), &vp),
        ];
        let plan = edge_plan(&items, &vp, MARGIN, 50).unwrap();
        let segments: Vec<(GeoPoint, GeoPoint)> = plan
            .iter()
            .map(|p| {
                let anchor = items.iter().find(|i| i.id == p.id).unwrap().anchor;
                (anchor, p.position)
            })
            .collect();
        assert_eq!(count_crossings(&segments), 0);
    }

    #[test]
    fn single_panel_on_an_edge_aligns_opposite_its_marker() {
        let vp = viewport();
        let items = vec![item("top", PixelPoint::new(321.0, 40.0), &vp)];
        let plan = edge_plan(&items, &vp, MARGIN, 50).unwrap();
        assert_eq!(plan[0].edge, ViewportEdge::North);
        let px = to_pixel(plan[0].position, &vp).unwrap();
        assert!((px.x - 321.0).abs() < 1e-6);
        assert!((px.y - (MARGIN + SIZE.height / 2.0)).abs() < 1e-6);
    }

    #[test]
    fn shared_edge_group_is_ordered_by_perpendicular_coordinate() {
        let vp = viewport();
        // Both markers are nearest the north edge; the more-westerly marker
        // must land in the more-westerly slot.
        let items = vec![
            item("east_marker", PixelPoint::new(700.0, 60.0), &vp),
            item("west_marker", PixelPoint::new(300.0, 60.0), &vp),
        ];
        let plan = edge_plan(&items, &vp, MARGIN, 50).unwrap();
        let px_of = |id: &str| {
            let p = plan.iter().find(|p| p.id.as_str() == id).unwrap();
            to_pixel(p.position, &vp).unwrap()
        };
        assert!(px_of("west_marker").x < px_of("east_marker").x);
        // Even slots: thirds of the edge.
        assert!((px_of("west_marker").x - 1000.0 / 3.0).abs() < 1e-6);
        assert!((px_of("east_marker").x - 2000.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn edge_plan_above_cutoff_places_by_nearest_edge_only() {
        let vp = viewport();
        let items = vec![
            item("a", PixelPoint::new(500.0, 60.0), &vp),
            item("b", PixelPoint::new(60.0, 400.0), &vp),
        ];
        // Cutoff below the item count: crossing checks skipped.
        let plan = edge_plan(&items, &vp, MARGIN, 1).unwrap();
        assert_eq!(plan.len(), 2);
        let a = plan.iter().find(|p| p.id.as_str() == "a").unwrap();
        let b = plan.iter().find(|p| p.id.as_str() == "b").unwrap();
        assert_eq!(a.edge, ViewportEdge::North);
        assert_eq!(b.edge, ViewportEdge::West);
    }

    #[test]
    fn empty_edge_plan_is_empty() {
        let vp = viewport();
        assert!(edge_plan(&[], &vp, MARGIN, 50).unwrap().is_empty());
    }

    #[test]
    fn avoid_overlap_returns_original_when_clear() {
        let vp = viewport();
        let proposed = vp.center;
        let placed = avoid_overlap(proposed, SIZE, &[], &vp, 30.0).unwrap();
        assert_eq!(placed, proposed);
    }

    #[test]
    fn avoid_overlap_reduces_or_clears_collision() {
        let vp = viewport();
        let occupied_at = vp.center;
        let occupied = panel_bounds(occupied_at, SIZE, &vp).unwrap();
        let placed = avoid_overlap(occupied_at, SIZE, &[occupied], &vp, 30.0).unwrap();
        let placed_bounds = panel_bounds(placed, SIZE, &vp).unwrap();
        let original_bounds = panel_bounds(occupied_at, SIZE, &vp).unwrap();
        let original_area = overlap_area(&original_bounds, &occupied);
        let new_area = overlap_area(&placed_bounds, &occupied);
        assert!(
            !overlaps(&placed_bounds, &occupied) || new_area < original_area,
            "fallback must clear or strictly reduce overlap"
        );
        assert_ne!(placed, occupied_at);
    }

    #[test]
    fn avoid_overlap_prefers_zero_overlap_candidates() {
        let vp = viewport();
        // A small occupied box; a 30px nudge fully clears it.
        let occupied = panel_bounds(vp.center, PixelSize::new(40.0, 40.0), &vp).unwrap();
        let placed = avoid_overlap(vp.center, PixelSize::new(20.0, 20.0), &[occupied], &vp, 30.0)
            .unwrap();
        let placed_bounds = panel_bounds(placed, PixelSize::new(20.0, 20.0), &vp).unwrap();
        assert!(!overlaps(&placed_bounds, &occupied));
    }

    #[test]
    fn avoid_overlap_discards_candidates_outside_the_viewport() {
        let vp = viewport();
        // Proposed point right at the viewport's west edge: westward
        // candidates fall outside and must not be selected.
        let proposed = to_geo(PixelPoint::new(5.0, 400.0), &vp).unwrap();
        let occupied = panel_bounds(proposed, SIZE, &vp).unwrap();
        let placed = avoid_overlap(proposed, SIZE, &[occupied], &vp, 30.0).unwrap();
        let placed_px = to_pixel(placed, &vp).unwrap();
        assert!(placed_px.x >= 0.0);
    }
}
