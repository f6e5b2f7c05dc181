// Deterministic radial layouter for skill trees.
//
// Goals:
// - Deterministic: no randomness, no time budgets, identical input -> identical output
// - Pure: the caller's nodes are only read; every call rebuilds its own state
// - Core nodes (tier 0) are pinned on the anchor
// - Tier N sits on ring N around the anchor, children fan out around their parents
// - No overlap: a bounded number of spatial-grid collision passes
//
// Submodules:
// - tree_builder: tier index, adjacency, branch resolution, cycle detection
// - angles: wraparound-safe angle arithmetic
// - radial_placement: first-pass ring/angle positions
// - spatial_grid: neighbour lookup for collision checks
// - collision: pairwise push-apart with pinned nodes
//
// Output:
// - PositionMap: node id -> (x, y), plus the anchor and pin flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ConfigError, Result};
use crate::model::{Point, SkillNode};

pub mod angles;
pub mod collision;
pub mod radial_placement;
pub mod spatial_grid;
pub mod tree_builder;

pub use tree_builder::TreeIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Anchor for tier 0.
    pub center_x: f64,
    pub center_y: f64,
    /// Radial distance added per tier.
    pub tier_spacing: f64,
    /// Minimum center-to-center distance between two nodes.
    pub node_spacing: f64,
    /// Node footprint (diameter).
    pub node_size: f64,
    /// Collision resolution passes. 0 disables resolution.
    pub iterations: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 1400.0,
            center_y: 1400.0,
            tier_spacing: 180.0,
            node_spacing: 80.0,
            node_size: 60.0,
            iterations: 4,
        }
    }
}

/// Largest magnitude accepted for any coordinate or distance in the config.
/// Rings and grid cells derived from it stay inside f64 and i64 range.
pub const MAX_EXTENT: f64 = 1e9;

impl LayoutConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [("centerX", self.center_x), ("centerY", self.center_y)] {
            check_extent(field, value)?;
        }
        for (field, value) in [
            ("tierSpacing", self.tier_spacing),
            ("nodeSpacing", self.node_spacing),
            ("nodeSize", self.node_size),
        ] {
            check_extent(field, value)?;
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    /// Distance below which two nodes count as overlapping.
    pub fn min_separation(&self) -> f64 {
        self.node_size.max(self.node_spacing)
    }
}

fn check_extent(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field, value });
    }
    if value.abs() > MAX_EXTENT {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            limit: MAX_EXTENT,
        });
    }
    Ok(())
}

/// A placed node. Serializes as `{ "x": .., "y": .. }`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    pub tier: u32,
    /// Pinned nodes never move during collision resolution.
    #[serde(skip)]
    pub pinned: bool,
}

impl Placement {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Box covering every node footprint.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Node id -> position, ordered by id.
///
/// Also remembers the anchor and ring spacing the positions were computed
/// against, which the collision pass needs to keep nodes on their ring.
/// Only the positions are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PositionMap {
    placements: BTreeMap<String, Placement>,
    #[serde(skip)]
    anchor: Point,
    #[serde(skip)]
    tier_spacing: f64,
}

impl PositionMap {
    pub fn new(anchor: Point, tier_spacing: f64) -> Self {
        Self {
            placements: BTreeMap::new(),
            anchor,
            tier_spacing,
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, placement: Placement) {
        self.placements.insert(id.into(), placement);
    }

    pub fn get(&self, id: &str) -> Option<Point> {
        self.placements.get(id).map(Placement::point)
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.get(id)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.placements.get(id).is_some_and(|p| p.pinned)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Placement)> {
        self.placements.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn tier_spacing(&self) -> f64 {
        self.tier_spacing
    }

    /// Bounding box of all nodes, each treated as a square of `node_size`.
    pub fn bounds(&self, node_size: f64) -> Option<Bounds> {
        let half = node_size / 2.0;
        self.placements.values().fold(None, |acc, p| {
            let b = Bounds {
                min_x: p.x - half,
                min_y: p.y - half,
                max_x: p.x + half,
                max_y: p.y + half,
            };
            Some(match acc {
                None => b,
                Some(a) => Bounds {
                    min_x: a.min_x.min(b.min_x),
                    min_y: a.min_y.min(b.min_y),
                    max_x: a.max_x.max(b.max_x),
                    max_y: a.max_y.max(b.max_y),
                },
            })
        })
    }
}

/// Everything one layout run produced.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    /// Dependency index the positions were derived from.
    pub tree: TreeIndex,
    /// Final, overlap-resolved positions.
    pub positions: PositionMap,
}

/// Run the full pipeline: tree builder -> radial placement -> collision resolution.
///
/// The configuration is checked before anything else. `nodes` is only read.
#[instrument(skip_all, fields(nodes = nodes.len()))]
pub fn layout_skill_tree(nodes: &[SkillNode], cfg: &LayoutConfig) -> Result<LayoutResult> {
    cfg.validate()?;

    let tree = tree_builder::build(nodes)?;
    let initial = radial_placement::layout(&tree, cfg);
    let positions = collision::resolve(&initial, cfg.min_separation(), cfg.iterations);

    debug!(
        placed = positions.len(),
        max_tier = tree.max_tier,
        "layout complete"
    );
    Ok(LayoutResult { tree, positions })
}

/// Node id -> final position for the given snapshot.
pub fn initialize_layout(nodes: &[SkillNode], cfg: &LayoutConfig) -> Result<PositionMap> {
    layout_skill_tree(nodes, cfg).map(|result| result.positions)
}
