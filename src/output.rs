//! Output types for the JavaScript renderer.
//!
//! These structs are serialized to JSON and handed to the game/editor front
//! end, which draws nodes at the given coordinates and decides which
//! connectors to show.

use serde::Serialize;

use crate::error::LayoutError;
use crate::layout::{Bounds, LayoutConfig, LayoutResult};

/// A positioned node ready for drawing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub tier: u32,
    /// Resolved branch (inherited through dependencies)
    pub branch: Option<String>,
    pub is_tier_gate: bool,
}

/// A dependency edge, parent -> child
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeOutput {
    pub from: String,
    pub to: String,
    /// Both ends resolved to the same branch
    pub same_branch: bool,
    /// The parent end is a tier gate
    pub tier_gate: bool,
}

/// Error information for the front end
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    /// "config", "cycle", "tier_order" or "input"
    pub kind: String,
}

impl From<&LayoutError> for ErrorInfo {
    fn from(err: &LayoutError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

/// The combined document sent to the renderer
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl LayoutOutput {
    /// Nodes in input order, edges in child input order then declaration order.
    pub fn from_result(result: &LayoutResult, cfg: &LayoutConfig) -> Self {
        let tree = &result.tree;

        let nodes = tree
            .node_ids()
            .filter_map(|nid| {
                let id = tree.id(nid);
                let p = result.positions.get(id)?;
                Some(NodeOutput {
                    id: id.to_string(),
                    x: p.x,
                    y: p.y,
                    tier: tree.tier(nid),
                    branch: tree.branch(nid).map(str::to_string),
                    is_tier_gate: tree.is_tier_gate(nid),
                })
            })
            .collect();

        let edges = tree
            .node_ids()
            .flat_map(|child| {
                tree.parents(child).iter().map(move |&parent| EdgeOutput {
                    from: tree.id(parent).to_string(),
                    to: tree.id(child).to_string(),
                    same_branch: tree.branch(parent) == tree.branch(child),
                    tier_gate: tree.is_tier_gate(parent),
                })
            })
            .collect();

        Self {
            nodes,
            edges,
            bounds: result.positions.bounds(cfg.node_size),
            error: None,
        }
    }

    pub fn from_error(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}
