//! Input model for the layout engine.
//!
//! Nodes arrive as an ordered list (the game's node table or the editor's
//! export). The engine only reads them; the `x`/`y` fields exist so data that
//! already carries coordinates round-trips untouched.

use serde::{Deserialize, Serialize};

/// Dense index of a node: its position in the input slice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One skill node as authored in the game data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillNode {
    /// Unique identifier
    pub id: String,
    /// Topological depth; 0 is the core.
    pub tier: u32,
    /// Branch hint. Core nodes usually leave this empty.
    #[serde(default)]
    pub branch: Option<String>,
    /// Parent node IDs in declaration order.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Gate nodes join branches; the renderer hides their connectors.
    #[serde(default)]
    pub is_tier_gate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl SkillNode {
    pub fn new(id: impl Into<String>, tier: u32, requires: &[&str]) -> Self {
        Self {
            id: id.into(),
            tier,
            branch: None,
            requires: requires.iter().map(|r| r.to_string()).collect(),
            is_tier_gate: false,
            x: None,
            y: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn tier_gate(mut self) -> Self {
        self.is_tier_gate = true;
        self
    }
}
