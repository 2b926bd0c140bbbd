//! Hierarchy Integrity Checks
//!
//! Depth and cycle checks for candidate parent assignments. Both walks follow
//! `parent_id` upward through a [`NodeOps`] handle, so they run equally against
//! the autocommit store or an open transaction.
//!
//! Neither walk trusts the stored data to be well formed: each is capped at
//! `max_depth + 1` hops, and running past the cap is reported as an
//! integrity violation instead of looping.

use crate::db::NodeOps;
use crate::models::NodeId;
use crate::services::TreeServiceError;

/// Default maximum number of levels from a root to any node (root = 1)
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Computes ancestor depth and detects circular parent references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityChecker {
    max_depth: usize,
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl IntegrityChecker {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn walk_limit(&self) -> usize {
        self.max_depth + 1
    }

    /// Number of nodes on the chain from `node_id` (inclusive) up to its root
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if `node_id` or any ancestor id does not resolve
    /// - `IntegrityViolation` if the chain is longer than `max_depth + 1`,
    ///   which only a cycle (or data written around the service) can produce
    pub async fn compute_depth<O>(&self, ops: &O, node_id: NodeId) -> Result<usize, TreeServiceError>
    where
        O: NodeOps + ?Sized,
    {
        let limit = self.walk_limit();
        let mut depth = 0;
        let mut current = Some(node_id);

        while let Some(id) = current {
            if depth >= limit {
                return Err(TreeServiceError::integrity_violation(format!(
                    "cycle detected: parent chain of node {} exceeds {} links",
                    node_id, limit
                )));
            }
            let node = ops
                .get_node(id)
                .await?
                .ok_or_else(|| TreeServiceError::node_not_found(id))?;
            depth += 1;
            current = node.parent_id;
        }

        Ok(depth)
    }

    /// Whether attaching `subject_id` under `candidate_parent` would create a cycle
    ///
    /// True if `subject_id` appears anywhere on the chain starting at
    /// `candidate_parent` (including the candidate itself). Attaching at the
    /// root (`None`) is never circular.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if a chain link does not resolve
    /// - `IntegrityViolation` if the walk exceeds `max_depth + 1` links
    pub async fn is_circular<O>(
        &self,
        ops: &O,
        candidate_parent: Option<NodeId>,
        subject_id: NodeId,
    ) -> Result<bool, TreeServiceError>
    where
        O: NodeOps + ?Sized,
    {
        let limit = self.walk_limit();
        let mut steps = 0;
        let mut current = candidate_parent;

        while let Some(id) = current {
            if id == subject_id {
                return Ok(true);
            }
            if steps >= limit {
                return Err(TreeServiceError::integrity_violation(format!(
                    "cycle detected: ancestor walk from node {} exceeds {} links",
                    candidate_parent.unwrap_or(id),
                    limit
                )));
            }
            let node = ops
                .get_node(id)
                .await?
                .ok_or_else(|| TreeServiceError::node_not_found(id))?;
            steps += 1;
            current = node.parent_id;
        }

        Ok(false)
    }

    /// Apply the depth policy for a new child of `parent_id`
    ///
    /// Returns the level the new node would occupy (root = 1).
    ///
    /// # Errors
    ///
    /// `DepthExceeded` if the parent already sits at `max_depth` or deeper,
    /// plus any error from [`IntegrityChecker::compute_depth`].
    pub async fn ensure_can_attach<O>(
        &self,
        ops: &O,
        parent_id: Option<NodeId>,
    ) -> Result<usize, TreeServiceError>
    where
        O: NodeOps + ?Sized,
    {
        let Some(parent_id) = parent_id else {
            return Ok(1);
        };

        let parent_depth = self.compute_depth(ops, parent_id).await?;
        if parent_depth >= self.max_depth {
            return Err(TreeServiceError::depth_exceeded(self.max_depth));
        }
        Ok(parent_depth + 1)
    }
}
