//! Layout engine for skill trees.
//!
//! Turns a dependency graph of skill nodes into deterministic, overlap-free
//! (x, y) coordinates: the core sits on an anchor, every tier on its own ring,
//! children fan out around the circular mean of their parents.

pub mod error;
pub mod layout;
pub mod model;
pub mod output;
mod wasm;

pub use error::{ConfigError, LayoutError};
pub use layout::{
    Bounds, LayoutConfig, LayoutResult, Placement, PositionMap, TreeIndex, initialize_layout,
    layout_skill_tree,
};
pub use model::{NodeId, Point, SkillNode};
pub use wasm::{default_config, layout_tree, node_positions};
