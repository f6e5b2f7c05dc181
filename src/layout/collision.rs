// Collision resolution: push overlapping nodes apart.
//
// Each iteration:
// 1. Bucket all nodes into a SpatialGrid with cell size = min separation
// 2. For every node (ascending id), test only the 3x3 cell neighbourhood,
//    visiting each pair once (lower id first)
// 3. Overlapping pairs get a push along their center line, scaled by the
//    overlap depth and split evenly; a pinned node absorbs nothing and its
//    partner takes the whole push. Coincident pairs have no center line and
//    are pushed along the ring tangent instead, so they spread around the ring
// 4. Pushes apply immediately, in pair order, and every moved node is clamped
//    back into the band around its ring so tiers stay radially ordered
//
// Work per iteration is O(n * k) for k nodes per neighbourhood. The loop stops
// at the iteration cap or at the first pass that finds no overlap.

use tracing::{debug, warn};

use super::spatial_grid::SpatialGrid;
use super::{Placement, PositionMap};
use crate::model::Point;

/// Distances within this of the minimum separation do not count as overlap.
const OVERLAP_EPSILON: f64 = 1e-6;

/// Below this length a center line has no usable direction.
const DEGENERATE_DISTANCE: f64 = 1e-9;

/// Push direction for coincident nodes sitting on the anchor itself.
const DEFAULT_PUSH: (f64, f64) = (1.0, 0.0);

/// Fraction of the tier spacing a node may drift off its ring, either way.
/// Below 0.5 so neighbouring tiers' bands never meet.
const RING_BAND: f64 = 0.45;

/// Resolve overlaps. Returns a new map; `positions` is left untouched.
pub fn resolve(positions: &PositionMap, min_separation: f64, iterations: u32) -> PositionMap {
    let mut resolved = positions.clone();
    if resolved.len() < 2 || iterations == 0 || min_separation <= 0.0 {
        return resolved;
    }

    // Working copy in ascending id order.
    let ids: Vec<String> = positions.iter().map(|(id, _)| id.to_string()).collect();
    let pinned: Vec<bool> = positions.iter().map(|(_, p)| p.pinned).collect();
    let tiers: Vec<u32> = positions.iter().map(|(_, p)| p.tier).collect();
    let mut points: Vec<Point> = positions.iter().map(|(_, p)| p.point()).collect();

    let anchor = positions.anchor();
    let tier_spacing = positions.tier_spacing();
    let mut remaining = 0;

    for iteration in 0..iterations {
        let grid = SpatialGrid::from_points(min_separation, &points);
        let mut overlaps = 0;

        for i in 0..points.len() {
            for j in grid.neighbors(points[i]) {
                if j <= i || (pinned[i] && pinned[j]) {
                    continue;
                }
                let Some(push) = push_apart(points[i], points[j], min_separation, anchor) else {
                    continue;
                };
                overlaps += 1;

                let (share_i, share_j) = match (pinned[i], pinned[j]) {
                    (true, _) => (0.0, 1.0),
                    (_, true) => (1.0, 0.0),
                    _ => (0.5, 0.5),
                };
                for (idx, sign, share) in [(i, -1.0, share_i), (j, 1.0, share_j)] {
                    if share == 0.0 {
                        continue;
                    }
                    let moved = Point::new(
                        points[idx].x + sign * push.0 * share,
                        points[idx].y + sign * push.1 * share,
                    );
                    points[idx] = if tiers[idx] > 0 && tier_spacing > 0.0 {
                        clamp_to_ring(moved, anchor, tiers[idx], tier_spacing)
                    } else {
                        moved
                    };
                }
            }
        }

        debug!(
            iteration,
            overlaps,
            cells = grid.occupied_cells(),
            "collision pass"
        );
        remaining = overlaps;
        if overlaps == 0 {
            break;
        }
    }

    if remaining > 0 {
        warn!(
            iterations,
            overlaps = remaining,
            "iteration cap reached with overlaps left"
        );
    }

    for (idx, id) in ids.iter().enumerate() {
        if let Some(placement) = positions.placement(id) {
            let moved = Placement {
                x: points[idx].x,
                y: points[idx].y,
                ..*placement
            };
            resolved.insert(id.as_str(), moved);
        }
    }
    resolved
}

/// Full push vector that moves `b` away from `a` until they are
/// `min_separation` apart, or `None` if they do not overlap.
fn push_apart(a: Point, b: Point, min_separation: f64, anchor: Point) -> Option<(f64, f64)> {
    if !overlaps(a, b, min_separation) {
        return None;
    }
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = dx.hypot(dy);
    let (ux, uy) = if dist > DEGENERATE_DISTANCE {
        (dx / dist, dy / dist)
    } else {
        ring_tangent(a, anchor)
    };
    let depth = min_separation - dist;
    Some((ux * depth, uy * depth))
}

fn overlaps(a: Point, b: Point, min_separation: f64) -> bool {
    a.distance(&b) + OVERLAP_EPSILON < min_separation
}

/// Unit tangent of the ring through `p`, clockwise on screen (y down).
/// Straight above the anchor this is `(1, 0)`.
fn ring_tangent(p: Point, anchor: Point) -> (f64, f64) {
    let vx = p.x - anchor.x;
    let vy = p.y - anchor.y;
    let r = vx.hypot(vy);
    if r > DEGENERATE_DISTANCE {
        (-vy / r, vx / r)
    } else {
        DEFAULT_PUSH
    }
}

/// Keep a node within RING_BAND * tier_spacing of its ring radius.
fn clamp_to_ring(p: Point, anchor: Point, tier: u32, tier_spacing: f64) -> Point {
    let ring = tier as f64 * tier_spacing;
    let lo = ring - RING_BAND * tier_spacing;
    let hi = ring + RING_BAND * tier_spacing;

    let dx = p.x - anchor.x;
    let dy = p.y - anchor.y;
    let r = dx.hypot(dy);
    if r >= lo && r <= hi {
        return p;
    }
    let (ux, uy) = if r > DEGENERATE_DISTANCE {
        (dx / r, dy / r)
    } else {
        DEFAULT_PUSH
    };
    let target = r.clamp(lo, hi);
    Point::new(anchor.x + ux * target, anchor.y + uy * target)
}

/// Number of node pairs closer than `min_separation`, found through the grid.
pub fn count_overlaps(positions: &PositionMap, min_separation: f64) -> usize {
    let points: Vec<Point> = positions.iter().map(|(_, p)| p.point()).collect();
    let grid = SpatialGrid::from_points(min_separation, &points);
    let mut count = 0;
    for (i, p) in points.iter().enumerate() {
        count += grid
            .neighbors(*p)
            .into_iter()
            .filter(|&j| j > i && overlaps(*p, points[j], min_separation))
            .count();
    }
    count
}

/// Sum of `min_separation - distance` over all overlapping pairs.
pub fn overlap_depth(positions: &PositionMap, min_separation: f64) -> f64 {
    let points: Vec<Point> = positions.iter().map(|(_, p)| p.point()).collect();
    let grid = SpatialGrid::from_points(min_separation, &points);
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        for j in grid.neighbors(*p) {
            if j > i && overlaps(*p, points[j], min_separation) {
                total += min_separation - p.distance(&points[j]);
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn map_with(entries: &[(&str, f64, f64, u32, bool)]) -> PositionMap {
        let mut map = PositionMap::new(Point::new(0.0, 0.0), 100.0);
        for &(id, x, y, tier, pinned) in entries {
            map.insert(id, Placement { x, y, tier, pinned });
        }
        map
    }

    #[test]
    fn test_symmetric_push() {
        let input = map_with(&[("a", 90.0, 0.0, 1, false), ("b", 110.0, 0.0, 1, false)]);
        let out = resolve(&input, 40.0, 1);

        let a = out.get("a").unwrap();
        let b = out.get("b").unwrap();
        assert!((a.x - 80.0).abs() < EPS);
        assert!((b.x - 120.0).abs() < EPS);
        assert!((a.distance(&b) - 40.0).abs() < EPS);
    }

    #[test]
    fn test_input_untouched() {
        let input = map_with(&[("a", 100.0, 0.0, 1, false), ("b", 100.0, 0.0, 1, false)]);
        let snapshot = input.clone();
        let _ = resolve(&input, 40.0, 3);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_pinned_node_never_moves() {
        let input = map_with(&[("core", 0.0, 0.0, 0, true), ("a", 10.0, 0.0, 1, false)]);
        let out = resolve(&input, 40.0, 5);

        assert_eq!(out.get("core"), Some(Point::new(0.0, 0.0)));
        // The free node took the full push, then stayed inside its ring band.
        let a = out.get("a").unwrap();
        assert!(a.x >= 40.0 - EPS);
        assert!(a.y.abs() < EPS);
    }

    #[test]
    fn test_both_pinned_ignored() {
        let input = map_with(&[("c1", 0.0, 0.0, 0, true), ("c2", 0.0, 0.0, 0, true)]);
        let out = resolve(&input, 40.0, 5);
        assert_eq!(out, input);
    }

    #[test]
    fn test_coincident_nodes_push_along_ring_tangent() {
        // Above the anchor the tangent is horizontal.
        let input = map_with(&[
            ("a", 0.0, -100.0, 1, false),
            ("b", 0.0, -100.0, 1, false),
        ]);
        let out = resolve(&input, 40.0, 1);
        let a = out.get("a").unwrap();
        let b = out.get("b").unwrap();
        assert!(a.x < 0.0 && b.x > 0.0);
        assert!((a.y - b.y).abs() < EPS);

        // Right of the anchor the tangent is vertical.
        let input = map_with(&[("a", 100.0, 0.0, 1, false), ("b", 100.0, 0.0, 1, false)]);
        let out = resolve(&input, 40.0, 1);
        let a = out.get("a").unwrap();
        let b = out.get("b").unwrap();
        assert!(a.y < 0.0 && b.y > 0.0);
        assert!((a.x - b.x).abs() < EPS);
        assert!((a.distance(&b) - 40.0).abs() < EPS);
    }

    #[test]
    fn test_coincident_on_anchor_uses_default_direction() {
        let input = map_with(&[("a", 0.0, 0.0, 2, false), ("b", 0.0, 0.0, 2, false)]);
        let out = resolve(&input, 40.0, 1);
        let a = out.get("a").unwrap();
        let b = out.get("b").unwrap();
        assert!(a.x.is_finite() && b.x.is_finite());
        assert!(a.x < 0.0 && b.x > 0.0);
    }

    #[test]
    fn test_packed_siblings_spread_on_horizontal_axis() {
        for start in [Point::new(180.0, 0.0), Point::new(-180.0, 0.0)] {
            let mut input = PositionMap::new(Point::new(0.0, 0.0), 180.0);
            let core = Placement {
                x: 0.0,
                y: 0.0,
                tier: 0,
                pinned: true,
            };
            input.insert("core", core);
            for i in 0..6 {
                let placement = Placement {
                    x: start.x,
                    y: start.y,
                    tier: 1,
                    pinned: false,
                };
                input.insert(format!("s{i}"), placement);
            }
            assert_eq!(count_overlaps(&input, 80.0), 15);

            let out = resolve(&input, 80.0, 200);
            assert_eq!(count_overlaps(&out, 80.0), 0, "packing at {start:?}");
            for (id, p) in out.iter().filter(|(_, p)| p.tier == 1) {
                let r = p.point().distance(&Point::new(0.0, 0.0));
                let band = 99.0 - 1e-6..=261.0 + 1e-6;
                assert!(band.contains(&r), "{id} at radius {r}");
            }
        }
    }

    #[test]
    fn test_packed_siblings_spread() {
        let mut input = PositionMap::new(Point::new(0.0, 0.0), 100.0);
        for i in 0..8 {
            let placement = Placement {
                x: 0.0,
                y: -100.0,
                tier: 1,
                pinned: false,
            };
            input.insert(format!("n{i}"), placement);
        }

        let before = count_overlaps(&input, 30.0);
        assert_eq!(before, 28);
        let out = resolve(&input, 30.0, 4);
        let after = count_overlaps(&out, 30.0);
        assert!(after < before, "{after} >= {before}");
    }

    #[test]
    fn test_ring_band_respected() {
        let input = map_with(&[
            ("core", 0.0, 0.0, 0, true),
            ("a", 0.0, -100.0, 1, false),
            ("b", 0.0, -100.0, 1, false),
            ("c", 0.0, -100.0, 1, false),
        ]);
        let out = resolve(&input, 150.0, 10);
        for id in ["a", "b", "c"] {
            let r = out.get(id).unwrap().distance(&Point::new(0.0, 0.0));
            assert!(r >= 55.0 - EPS && r <= 145.0 + EPS, "{id} at radius {r}");
        }
    }

    #[test]
    fn test_deterministic() {
        let input = map_with(&[
            ("a", 5.0, 95.0, 1, false),
            ("b", 6.0, 96.0, 1, false),
            ("c", 4.0, 94.0, 1, false),
            ("d", 50.0, 80.0, 1, false),
        ]);
        let first = resolve(&input, 40.0, 4);
        let second = resolve(&input, 40.0, 4);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_overlap_depth() {
        let input = map_with(&[("a", 0.0, 100.0, 1, false), ("b", 10.0, 100.0, 1, false)]);
        assert!((overlap_depth(&input, 40.0) - 30.0).abs() < EPS);
        assert_eq!(count_overlaps(&input, 40.0), 1);
        assert_eq!(overlap_depth(&input, 10.0), 0.0);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let input = map_with(&[("a", 0.0, 100.0, 1, false), ("b", 0.0, 100.0, 1, false)]);
        assert_eq!(resolve(&input, 40.0, 0), input);
    }
}
