// Tree builder: flat node list -> tier-indexed dependency tree.
//
// What this does:
// - Assigns every node a dense NodeId (its index in the input)
// - Enforces unique node ids
// - Resolves `requires` entries to NodeIds, dropping references to unknown ids
// - Groups nodes by tier, preserving input order within a tier
// - Validates acyclicity with Kahn's algorithm, then the tier invariant
// - Resolves a branch per node, walking the graph in topological order
//
// No geometry happens here.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::error::{LayoutError, Result};
use crate::model::{NodeId, SkillNode};

/// Read-only index over the dependency graph.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    ids: Vec<String>,
    tiers: Vec<u32>,
    tier_gates: Vec<bool>,
    /// Filtered parents, in declaration order.
    parents: Vec<Vec<NodeId>>,
    /// Children, in input order.
    children: Vec<Vec<NodeId>>,
    branches: Vec<Option<String>>,
    lookup: HashMap<String, NodeId>,
    /// Tier -> nodes in input order, ascending tier.
    pub nodes_by_tier: BTreeMap<u32, Vec<NodeId>>,
    pub max_tier: u32,
    /// Kahn order: every parent precedes its children.
    pub topo_order: Vec<NodeId>,
    /// Number of `requires` entries pointing at unknown ids.
    pub dropped_edges: usize,
}

impl TreeIndex {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, nid: NodeId) -> &str {
        &self.ids[nid.0]
    }

    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.lookup.get(id).copied()
    }

    pub fn tier(&self, nid: NodeId) -> u32 {
        self.tiers[nid.0]
    }

    pub fn is_tier_gate(&self, nid: NodeId) -> bool {
        self.tier_gates[nid.0]
    }

    pub fn parents(&self, nid: NodeId) -> &[NodeId] {
        &self.parents[nid.0]
    }

    pub fn children(&self, nid: NodeId) -> &[NodeId] {
        &self.children[nid.0]
    }

    /// Resolved branch; `None` for core nodes and unbranched descendants.
    pub fn branch(&self, nid: NodeId) -> Option<&str> {
        self.branches[nid.0].as_deref()
    }

    /// A root has no (existing) parents.
    pub fn is_root(&self, nid: NodeId) -> bool {
        self.parents[nid.0].is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.ids.len()).map(NodeId)
    }
}

/// Build the tree index from an ordered node list.
pub fn build(nodes: &[SkillNode]) -> Result<TreeIndex> {
    let mut lookup: HashMap<String, NodeId> = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        if lookup.insert(node.id.clone(), NodeId(idx)).is_some() {
            return Err(LayoutError::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    let mut parents: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
    let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
    let mut nodes_by_tier: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
    let mut dropped_edges = 0;

    for (idx, node) in nodes.iter().enumerate() {
        let nid = NodeId(idx);
        nodes_by_tier.entry(node.tier).or_default().push(nid);

        for req in &node.requires {
            match lookup.get(req.as_str()) {
                Some(&pid) => {
                    if !parents[idx].contains(&pid) {
                        parents[idx].push(pid);
                    }
                }
                None => {
                    dropped_edges += 1;
                    debug!(
                        node = %node.id,
                        missing = %req,
                        "dropping dangling requirement"
                    );
                }
            }
        }
    }

    // Children lists in input order: walk children by index.
    for (idx, plist) in parents.iter().enumerate() {
        for &pid in plist {
            children[pid.0].push(NodeId(idx));
        }
    }

    let max_tier = nodes.iter().map(|n| n.tier).max().unwrap_or(0);
    let topo_order = topological_order(nodes, &parents, &children)?;

    // Tier must strictly increase along every edge.
    for (idx, plist) in parents.iter().enumerate() {
        let node = &nodes[idx];
        for &pid in plist {
            let parent = &nodes[pid.0];
            if node.tier <= parent.tier {
                return Err(LayoutError::TierOrder {
                    node: node.id.clone(),
                    tier: node.tier,
                    parent: parent.id.clone(),
                    parent_tier: parent.tier,
                });
            }
        }
    }

    let branches = resolve_branches(nodes, &parents, &topo_order);

    debug!(
        nodes = nodes.len(),
        tiers = nodes_by_tier.len(),
        max_tier,
        dropped_edges,
        "built tree index"
    );

    Ok(TreeIndex {
        ids: nodes.iter().map(|n| n.id.clone()).collect(),
        tiers: nodes.iter().map(|n| n.tier).collect(),
        tier_gates: nodes.iter().map(|n| n.is_tier_gate).collect(),
        parents,
        children,
        branches,
        lookup,
        nodes_by_tier,
        max_tier,
        topo_order,
        dropped_edges,
    })
}

/// Kahn's algorithm. The queue is seeded in input order and children are
/// released in input order, so the result is deterministic.
fn topological_order(
    nodes: &[SkillNode],
    parents: &[Vec<NodeId>],
    children: &[Vec<NodeId>],
) -> Result<Vec<NodeId>> {
    let mut in_degree: Vec<usize> = parents.iter().map(|p| p.len()).collect();
    let mut queue: VecDeque<NodeId> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(idx, _)| NodeId(idx))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(nid) = queue.pop_front() {
        order.push(nid);
        for &child in &children[nid.0] {
            in_degree[child.0] -= 1;
            if in_degree[child.0] == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(idx, _)| nodes[idx].id.clone())
            .collect();
        return Err(LayoutError::CyclicDependency { nodes: stuck });
    }
    Ok(order)
}

/// Branch inheritance along dependency edges.
///
/// Candidates are the parents' resolved branches in declaration order, with
/// tier-gate parents only consulted when every parent is a gate. The node's
/// own hint breaks ties between candidates and fills in when there is none.
fn resolve_branches(
    nodes: &[SkillNode],
    parents: &[Vec<NodeId>],
    topo_order: &[NodeId],
) -> Vec<Option<String>> {
    let mut branches: Vec<Option<String>> = vec![None; nodes.len()];

    for &nid in topo_order {
        let node = &nodes[nid.0];
        let plist = &parents[nid.0];
        if plist.is_empty() && node.tier == 0 {
            continue;
        }

        let all_gates = plist.iter().all(|p| nodes[p.0].is_tier_gate);
        let candidates: Vec<&str> = plist
            .iter()
            .filter(|p| all_gates || !nodes[p.0].is_tier_gate)
            .filter_map(|p| branches[p.0].as_deref())
            .collect();

        let hint = node.branch.as_deref();
        let resolved = match (hint, candidates.first()) {
            (Some(h), Some(_)) if candidates.contains(&h) => Some(h),
            (_, Some(first)) => Some(*first),
            (h, None) => h,
        }
        .map(str::to_string);
        branches[nid.0] = resolved;
    }
    branches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Vec<SkillNode> {
        vec![
            SkillNode::new("A", 0, &[]),
            SkillNode::new("B", 1, &["A"]),
            SkillNode::new("C", 1, &["A"]),
            SkillNode::new("D", 2, &["B", "C"]),
        ]
    }

    fn ids(tree: &TreeIndex, list: &[NodeId]) -> Vec<String> {
        list.iter().map(|&n| tree.id(n).to_string()).collect()
    }

    #[test]
    fn test_diamond_adjacency() {
        let tree = build(&diamond()).unwrap();
        let a = tree.lookup("A").unwrap();
        let d = tree.lookup("D").unwrap();

        assert_eq!(ids(&tree, tree.children(a)), vec!["B", "C"]);
        assert_eq!(ids(&tree, tree.parents(d)), vec!["B", "C"]);
        assert_eq!(tree.max_tier, 2);
        assert_eq!(tree.max_tier, tree.tier(d));
        assert!(tree.is_root(a));
        assert!(!tree.is_root(d));
    }

    #[test]
    fn test_nodes_by_tier_preserves_order() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("z", 1, &["core"]),
            SkillNode::new("a", 1, &["core"]),
            SkillNode::new("m", 1, &["core"]),
        ];
        let tree = build(&nodes).unwrap();
        let tier1 = tree.nodes_by_tier.get(&1).unwrap();
        assert_eq!(ids(&tree, tier1), vec!["z", "a", "m"]);
        let tiers: Vec<u32> = tree.nodes_by_tier.keys().copied().collect();
        assert_eq!(tiers, vec![0, 1]);
    }

    #[test]
    fn test_cycle_detected() {
        let nodes = vec![
            SkillNode::new("A", 1, &["B"]),
            SkillNode::new("B", 2, &["A"]),
        ];
        match build(&nodes) {
            Err(LayoutError::CyclicDependency { nodes }) => assert_eq!(nodes, vec!["A", "B"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let nodes = vec![SkillNode::new("A", 1, &["A"])];
        assert!(matches!(
            build(&nodes),
            Err(LayoutError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_dangling_parent_dropped() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("a", 1, &["core", "ghost"]),
        ];
        let tree = build(&nodes).unwrap();
        let a = tree.lookup("a").unwrap();
        assert_eq!(ids(&tree, tree.parents(a)), vec!["core"]);
        assert_eq!(tree.dropped_edges, 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("core", 1, &[]),
        ];
        assert_eq!(
            build(&nodes).unwrap_err(),
            LayoutError::DuplicateNodeId {
                id: "core".to_string()
            }
        );
    }

    #[test]
    fn test_tier_must_exceed_parent() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("a", 1, &["core"]),
            SkillNode::new("b", 1, &["a"]),
        ];
        match build(&nodes) {
            Err(LayoutError::TierOrder { node, parent, .. }) => {
                assert_eq!(node, "b");
                assert_eq!(parent, "a");
            }
            other => panic!("expected tier order error, got {:?}", other),
        }
    }

    #[test]
    fn test_branch_inherits_first_parent() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]).with_branch("ignored"),
            SkillNode::new("fire", 1, &["core"]).with_branch("fire"),
            SkillNode::new("water", 1, &["core"]).with_branch("water"),
            SkillNode::new("steam", 2, &["fire", "water"]),
            SkillNode::new("ember", 2, &["fire"]).with_branch("water"),
        ];
        let tree = build(&nodes).unwrap();
        let get = |id: &str| tree.branch(tree.lookup(id).unwrap()).map(str::to_string);

        assert_eq!(get("core"), None);
        assert_eq!(get("fire").as_deref(), Some("fire"));
        assert_eq!(get("steam").as_deref(), Some("fire"));
        // A hint that matches no parent does not override inheritance.
        assert_eq!(get("ember").as_deref(), Some("fire"));
    }

    #[test]
    fn test_branch_hint_breaks_tie() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("fire", 1, &["core"]).with_branch("fire"),
            SkillNode::new("water", 1, &["core"]).with_branch("water"),
            SkillNode::new("steam", 2, &["fire", "water"]).with_branch("water"),
        ];
        let tree = build(&nodes).unwrap();
        assert_eq!(tree.branch(tree.lookup("steam").unwrap()), Some("water"));
    }

    #[test]
    fn test_tier_gate_parent_skipped() {
        let nodes = vec![
            SkillNode::new("core", 0, &[]),
            SkillNode::new("gate", 1, &["core"]).with_branch("gates").tier_gate(),
            SkillNode::new("fire", 1, &["core"]).with_branch("fire"),
            SkillNode::new("blaze", 2, &["gate", "fire"]),
            SkillNode::new("beyond", 2, &["gate"]),
        ];
        let tree = build(&nodes).unwrap();
        assert_eq!(tree.branch(tree.lookup("blaze").unwrap()), Some("fire"));
        // Only gate parents: fall back to the gate's branch.
        assert_eq!(tree.branch(tree.lookup("beyond").unwrap()), Some("gates"));
        assert!(tree.is_tier_gate(tree.lookup("gate").unwrap()));
    }

    #[test]
    fn test_topo_order_parents_first() {
        let nodes = vec![
            SkillNode::new("D", 2, &["B", "C"]),
            SkillNode::new("C", 1, &["A"]),
            SkillNode::new("B", 1, &["A"]),
            SkillNode::new("A", 0, &[]),
        ];
        let tree = build(&nodes).unwrap();
        let pos = |id: &str| {
            let nid = tree.lookup(id).unwrap();
            tree.topo_order.iter().position(|&n| n == nid).unwrap()
        };
        assert!(pos("A") < pos("B"));
        assert!(pos("A") < pos("C"));
        assert!(pos("B") < pos("D"));
        assert!(pos("C") < pos("D"));
    }
}
