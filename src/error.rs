use thiserror::Error;

/// Rejected layout configuration. Raised before any graph work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{field}` must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("`{field}` must be greater than zero, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("`{field}` must be at most {limit} in magnitude, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        limit: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("duplicate node id `{id}`")]
    DuplicateNodeId { id: String },

    #[error("cyclic dependency between nodes: {}", .nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },

    #[error("node `{node}` (tier {tier}) must be above parent `{parent}` (tier {parent_tier})")]
    TierOrder {
        node: String,
        tier: u32,
        parent: String,
        parent_tier: u32,
    },
}

impl LayoutError {
    /// Short machine-readable category for the JS side.
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutError::Config(_) | LayoutError::DuplicateNodeId { .. } => "config",
            LayoutError::CyclicDependency { .. } => "cycle",
            LayoutError::TierOrder { .. } => "tier_order",
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
