// Radial placement ("rings" layout).
//
// First pass of the layout:
// 1. Tier 0 nodes sit on the anchor and are pinned
// 2. Tier t sits on the ring of radius t * tier_spacing
// 3. A node's direction is the circular mean of its parents' directions
// 4. Nodes with the same parent set fan out around that direction, one chord
//    of `min_separation` apart
// 5. Nodes without any existing parent take evenly spaced slots on their ring
//
// Tiers are processed in ascending order, so parents are always placed before
// their children. The result may still overlap; see `collision`.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use tracing::debug;

use super::angles::{ROOT_ANGLE, angle_from, circular_mean, normalize_angle, polar_to_point};
use super::{LayoutConfig, Placement, PositionMap, TreeIndex};
use crate::model::{NodeId, Point};

/// Siblings that share a tier and a parent set.
#[derive(Debug)]
struct SiblingGroup {
    parents: Vec<NodeId>,
    members: Vec<NodeId>,
}

/// Compute first-pass positions for every node in the tree.
pub fn layout(tree: &TreeIndex, cfg: &LayoutConfig) -> PositionMap {
    let anchor = cfg.anchor();
    let min_separation = cfg.min_separation();
    let mut placed: Vec<Option<Point>> = vec![None; tree.len()];
    let mut positions = PositionMap::new(anchor, cfg.tier_spacing);

    for (&tier, members) in &tree.nodes_by_tier {
        if tier == 0 {
            for &nid in members {
                placed[nid.0] = Some(anchor);
                let placement = Placement {
                    x: anchor.x,
                    y: anchor.y,
                    tier,
                    pinned: true,
                };
                positions.insert(tree.id(nid), placement);
            }
            continue;
        }

        let radius = tier as f64 * cfg.tier_spacing;
        let (groups, orphans) = group_siblings(tree, members);

        for group in &groups {
            let parent_points = group.parents.iter().filter_map(|p| placed[p.0]);
            let mean = parent_mean_angle(anchor, parent_points);
            let step = fan_step(radius, min_separation, group.members.len());
            let angles = fan_angles(mean, group.members.len(), step);

            for (&nid, angle) in group.members.iter().zip(angles) {
                let p = polar_to_point(anchor, radius, angle);
                placed[nid.0] = Some(p);
                positions.insert(tree.id(nid), free_placement(p, tier));
            }
        }

        for (i, &nid) in orphans.iter().enumerate() {
            let angle = normalize_angle(ROOT_ANGLE + TAU * i as f64 / orphans.len() as f64);
            let p = polar_to_point(anchor, radius, angle);
            placed[nid.0] = Some(p);
            positions.insert(tree.id(nid), free_placement(p, tier));
        }

        debug!(
            tier,
            radius,
            groups = groups.len(),
            orphans = orphans.len(),
            "placed tier"
        );
    }

    positions
}

fn free_placement(p: Point, tier: u32) -> Placement {
    Placement {
        x: p.x,
        y: p.y,
        tier,
        pinned: false,
    }
}

/// Split a tier into sibling groups (first-seen order) and parentless nodes.
/// Groups are keyed by parent set, so `requires` order does not matter.
fn group_siblings(tree: &TreeIndex, members: &[NodeId]) -> (Vec<SiblingGroup>, Vec<NodeId>) {
    let mut groups: Vec<SiblingGroup> = Vec::new();
    let mut index: HashMap<Vec<NodeId>, usize> = HashMap::new();
    let mut orphans = Vec::new();

    for &nid in members {
        let parents = tree.parents(nid);
        if parents.is_empty() {
            orphans.push(nid);
            continue;
        }
        let mut key = parents.to_vec();
        key.sort_unstable();
        match index.get(&key) {
            Some(&gi) => groups[gi].members.push(nid),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(SiblingGroup {
                    parents: key,
                    members: vec![nid],
                });
            }
        }
    }
    (groups, orphans)
}

/// Circular mean of the parents' directions from the anchor.
/// Parents on the anchor carry no direction; with none left, use ROOT_ANGLE.
pub fn parent_mean_angle(anchor: Point, parents: impl Iterator<Item = Point>) -> f64 {
    let angles: Vec<f64> = parents.filter_map(|p| angle_from(anchor, p)).collect();
    if angles.is_empty() {
        ROOT_ANGLE
    } else {
        circular_mean(&angles)
    }
}

/// Angular step between neighbouring siblings on a ring of `radius`: the
/// angle whose chord equals `min_separation`, capped so `count` siblings
/// never wrap past a full turn.
pub fn fan_step(radius: f64, min_separation: f64, count: usize) -> f64 {
    if count <= 1 || radius <= 0.0 {
        return 0.0;
    }
    let chord_step = if min_separation >= 2.0 * radius {
        PI
    } else {
        2.0 * (min_separation / (2.0 * radius)).asin()
    };
    chord_step.min(TAU / count as f64)
}

/// `count` angles spread symmetrically around `mean`, normalized to (-PI, PI].
pub fn fan_angles(mean: f64, count: usize, step: f64) -> Vec<f64> {
    let center = (count as f64 - 1.0) / 2.0;
    (0..count)
        .map(|i| normalize_angle(mean + (i as f64 - center) * step))
        .collect()
}
