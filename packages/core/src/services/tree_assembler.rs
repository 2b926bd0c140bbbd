//! Tree Assembly
//!
//! Pure transformation from a flat list of nodes into nested [`TreeNode`]s.
//!
//! The parent → children index is built once per call (adjacency list), so
//! assembly is O(n). Siblings keep the order in which they appear in the
//! input; no sorting is imposed.

use std::collections::{HashMap, HashSet};

use crate::models::{Node, NodeId, TreeNode};
use crate::services::TreeServiceError;

/// Indexes of the input slice, grouped by parent id (`None` = roots)
struct ChildIndex<'a> {
    nodes: &'a [Node],
    children: HashMap<Option<NodeId>, Vec<usize>>,
}

impl<'a> ChildIndex<'a> {
    fn build(nodes: &'a [Node]) -> Self {
        let mut children: HashMap<Option<NodeId>, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            children.entry(node.parent_id).or_default().push(idx);
        }
        Self { nodes, children }
    }

    fn subtrees(&self, parent_id: Option<NodeId>, path: &mut HashSet<NodeId>) -> Vec<TreeNode> {
        self.children
            .get(&parent_id)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|&idx| self.subtree(&self.nodes[idx], path))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `path` holds the ids being expanded above this call; a node already on
    /// it belongs to a stored cycle and is not expanded a second time.
    fn subtree(&self, node: &Node, path: &mut HashSet<NodeId>) -> Option<TreeNode> {
        if !path.insert(node.id) {
            tracing::warn!("Skipping node {} already on the current path (cycle)", node.id);
            return None;
        }
        let list_division = self.subtrees(Some(node.id), path);
        path.remove(&node.id);

        Some(TreeNode {
            node: node.clone(),
            list_division,
        })
    }
}

/// Nest `nodes` under `root_parent_id`
///
/// Returns every node whose `parent_id` equals `root_parent_id` (`None`
/// matches nodes without a parent), each carrying its recursively assembled
/// children. The input is not modified.
pub fn assemble(nodes: &[Node], root_parent_id: Option<NodeId>) -> Vec<TreeNode> {
    let index = ChildIndex::build(nodes);
    let mut path = HashSet::new();
    index.subtrees(root_parent_id, &mut path)
}

/// Locate `node_id` in `nodes` and return it with its subtree
///
/// # Errors
///
/// `NodeNotFound` if no node in `nodes` has this id.
pub fn assemble_single(nodes: &[Node], node_id: NodeId) -> Result<TreeNode, TreeServiceError> {
    let node = nodes
        .iter()
        .find(|n| n.id == node_id)
        .ok_or_else(|| TreeServiceError::node_not_found(node_id))?;

    let index = ChildIndex::build(nodes);
    let mut path = HashSet::new();
    // The starting node is fresh, so subtree() always yields Some here
    Ok(index
        .subtree(node, &mut path)
        .unwrap_or_else(|| TreeNode::leaf(node.clone())))
}
