//! Tree Mutation Service
//!
//! `TreeService` orchestrates every read and write of the division tree:
//!
//! - Reads fetch the flat node set once and hand it to the tree assembler
//! - Mutations consult the [`IntegrityChecker`] before touching the store
//! - Every mutation runs inside one store transaction, so its checks and
//!   writes see the same state and a failure leaves nothing behind
//!
//! The service caches nothing between calls; each operation re-reads the
//! state its decision depends on.
//!
//! # Examples
//!
//! ```no_run
//! use divtree_core::db::{DatabaseService, TursoStore};
//! use divtree_core::models::{BulkNodeRequest, NewNode};
//! use divtree_core::services::TreeService;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/divtree.db")).await?);
//!     let service = TreeService::new(Arc::new(TursoStore::new(db)));
//!
//!     let hq = service.create_node(NewNode::new("HQ", "Head Office", None)).await?;
//!     service
//!         .bulk_insert(&[BulkNodeRequest::new("FIN", "Finance")], Some(hq.id))
//!         .await?;
//!
//!     let forest = service.get_tree().await?;
//!     println!("{} root(s)", forest.len());
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::db::{NodeOps, NodeStore, StoreTransaction};
use crate::models::{BulkNodeRequest, NewNode, Node, NodeId, NodeUpdate, TreeNode};
use crate::services::integrity::{IntegrityChecker, DEFAULT_MAX_DEPTH};
use crate::services::tree_assembler;
use crate::services::TreeServiceError;

type BoxedInsert<'a> = Pin<Box<dyn Future<Output = Result<usize, TreeServiceError>> + Send + 'a>>;

/// Tunables for [`TreeService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of levels from a root to any node (root = 1)
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Create, read, update, delete and bulk-insert operations over the node tree
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn NodeStore>,
    checker: IntegrityChecker,
}

impl TreeService {
    /// Create a service with the default five-level limit
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self::with_config(store, TreeConfig::default())
    }

    pub fn with_config(store: Arc<dyn NodeStore>, config: TreeConfig) -> Self {
        Self {
            store,
            checker: IntegrityChecker::new(config.max_depth),
        }
    }

    /// Access the underlying store
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn checker(&self) -> &IntegrityChecker {
        &self.checker
    }

    /// The whole forest, roots in store order
    pub async fn get_tree(&self) -> Result<Vec<TreeNode>, TreeServiceError> {
        let nodes = self.store.get_all_nodes().await?;
        tracing::debug!("Assembling tree from {} nodes", nodes.len());
        Ok(tree_assembler::assemble(&nodes, None))
    }

    /// One node with its assembled subtree
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id.
    pub async fn get_node_by_id(&self, id: NodeId) -> Result<TreeNode, TreeServiceError> {
        if self.store.get_node(id).await?.is_none() {
            return Err(TreeServiceError::node_not_found(id));
        }

        let nodes = self.store.get_all_nodes().await?;
        tree_assembler::assemble_single(&nodes, id)
    }

    /// Create a single node
    ///
    /// Checks, in order: required fields, code uniqueness, the depth limit
    /// under the requested parent, and (for pre-assigned ids) that the node
    /// would not become its own ancestor.
    ///
    /// # Errors
    ///
    /// `ValidationFailed`, `DuplicateCode`, `NodeNotFound` (missing parent),
    /// `DepthExceeded`, `IntegrityViolation`, or a store error.
    pub async fn create_node(&self, new_node: NewNode) -> Result<Node, TreeServiceError> {
        new_node.validate()?;

        let tx = self.store.begin().await?;
        let result = self.create_within(tx.as_ref(), &new_node).await;
        let node = finish(tx, result).await?;

        tracing::info!("Created node {} ({})", node.id, node.code);
        Ok(node)
    }

    async fn create_within(
        &self,
        ops: &dyn StoreTransaction,
        new_node: &NewNode,
    ) -> Result<Node, TreeServiceError> {
        ensure_code_available(ops, &new_node.code, None).await?;

        self.checker.ensure_can_attach(ops, new_node.parent_id).await?;

        // Only a caller-supplied id can already appear on the parent chain
        if let Some(id) = new_node.id {
            if self.checker.is_circular(ops, new_node.parent_id, id).await? {
                return Err(TreeServiceError::integrity_violation(format!(
                    "circular reference is not allowed: node {} under {:?}",
                    id, new_node.parent_id
                )));
            }
        }

        Ok(ops.insert_node(new_node).await?)
    }

    /// Replace code, name and parent of an existing node
    ///
    /// Depth is deliberately not re-validated here: moving a subtree under a
    /// new parent may leave nodes deeper than the limit. Only creation and
    /// bulk insertion enforce depth.
    ///
    /// # Errors
    ///
    /// `ValidationFailed`, `NodeNotFound`, `DuplicateCode`,
    /// `IntegrityViolation` (new parent is the node itself or one of its
    /// descendants), or a store error. On error the node is unchanged.
    pub async fn update_node(
        &self,
        id: NodeId,
        update: NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        update.validate()?;

        let tx = self.store.begin().await?;
        let result = self.update_within(tx.as_ref(), id, &update).await;
        let node = finish(tx, result).await?;

        tracing::info!("Updated node {} ({})", node.id, node.code);
        Ok(node)
    }

    async fn update_within(
        &self,
        ops: &dyn StoreTransaction,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Node, TreeServiceError> {
        let current = ops
            .get_node(id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(id))?;

        if update.code != current.code {
            ensure_code_available(ops, &update.code, Some(id)).await?;
        }

        if self.checker.is_circular(ops, update.parent_id, id).await? {
            return Err(TreeServiceError::integrity_violation(format!(
                "circular reference is not allowed: node {} under {:?}",
                id, update.parent_id
            )));
        }

        ops.update_node(id, update)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(id))
    }

    /// Delete a node and every transitive descendant in one transaction
    ///
    /// Descendants are removed before their parents. Deleting an id that does
    /// not exist succeeds and changes nothing. Returns the number of rows
    /// removed.
    pub async fn delete_node_with_children(&self, id: NodeId) -> Result<u64, TreeServiceError> {
        let tx = self.store.begin().await?;
        let result = delete_subtree(tx.as_ref(), id).await;
        let deleted = finish(tx, result).await?;

        if deleted == 0 {
            tracing::debug!("Delete of absent node {} was a no-op", id);
        } else {
            tracing::info!("Deleted node {} and its subtree ({} rows)", id, deleted);
        }
        Ok(deleted)
    }

    /// Insert a nested forest atomically
    ///
    /// Items are inserted depth-first in request order. When `parent_id` is
    /// given the batch hangs under that node and its first level is one below
    /// the parent's depth; otherwise the first level is a new root level.
    /// Any failure rolls back the whole batch. Returns the number of nodes
    /// inserted.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if any item lacks a code or name
    /// - `NodeNotFound` if `parent_id` does not exist
    /// - `DepthExceeded` before inserting anything at a level past the limit
    /// - `DuplicateCode` if an item's code exists, including codes inserted
    ///   earlier in the same batch
    #[tracing::instrument(skip(self, requests), fields(items = requests.len()))]
    pub async fn bulk_insert(
        &self,
        requests: &[BulkNodeRequest],
        parent_id: Option<NodeId>,
    ) -> Result<usize, TreeServiceError> {
        validate_batch(requests)?;
        tracing::debug!(
            "Bulk insert of {} nodes requested",
            requests.iter().map(BulkNodeRequest::total_count).sum::<usize>()
        );

        let tx = self.store.begin().await?;
        let result = self.bulk_insert_within(tx.as_ref(), requests, parent_id).await;
        let inserted = finish(tx, result).await?;

        tracing::info!("Bulk inserted {} nodes", inserted);
        Ok(inserted)
    }

    async fn bulk_insert_within(
        &self,
        tx: &dyn StoreTransaction,
        requests: &[BulkNodeRequest],
        parent_id: Option<NodeId>,
    ) -> Result<usize, TreeServiceError> {
        // A missing parent surfaces as NodeNotFound; a parent at the limit
        // means level max_depth + 1, which is rejected the same way as below
        let first_level = self.checker.ensure_can_attach(tx, parent_id).await?;
        self.insert_level(tx, requests, parent_id, first_level).await
    }

    fn insert_level<'a>(
        &'a self,
        tx: &'a dyn StoreTransaction,
        items: &'a [BulkNodeRequest],
        parent_id: Option<NodeId>,
        level: usize,
    ) -> BoxedInsert<'a> {
        Box::pin(async move {
            if level > self.checker.max_depth() {
                return Err(TreeServiceError::depth_exceeded(self.checker.max_depth()));
            }

            let mut inserted = 0;
            for item in items {
                ensure_code_available(tx, &item.code, None).await?;

                let node = tx
                    .insert_node(&NewNode::new(item.code.as_str(), item.name.as_str(), parent_id))
                    .await?;
                inserted += 1;
                tracing::debug!("Inserted {} at level {} (id {})", node.code, level, node.id);

                if !item.list_division.is_empty() {
                    inserted += self
                        .insert_level(tx, &item.list_division, Some(node.id), level + 1)
                        .await?;
                }
            }
            Ok(inserted)
        })
    }
}

/// Commit on success, roll back on failure, and hand back the original result
async fn finish<T>(
    tx: Box<dyn StoreTransaction>,
    result: Result<T, TreeServiceError>,
) -> Result<T, TreeServiceError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!("Rolling back: {}", err);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// Reject `code` if a node other than `owner` already uses it
async fn ensure_code_available<O>(
    ops: &O,
    code: &str,
    owner: Option<NodeId>,
) -> Result<(), TreeServiceError>
where
    O: NodeOps + ?Sized,
{
    match ops.get_node_by_code(code).await? {
        Some(existing) if Some(existing.id) != owner => {
            Err(TreeServiceError::duplicate_code(code))
        }
        _ => Ok(()),
    }
}

fn validate_batch(requests: &[BulkNodeRequest]) -> Result<(), TreeServiceError> {
    for request in requests {
        request.validate()?;
        validate_batch(&request.list_division)?;
    }
    Ok(())
}

/// Delete `root_id` and its descendants, children before parents
///
/// The visited set keeps a corrupted (cyclic) chain from looping forever.
async fn delete_subtree<O>(ops: &O, root_id: NodeId) -> Result<u64, TreeServiceError>
where
    O: NodeOps + ?Sized,
{
    let mut post_order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root_id, false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            post_order.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for child in ops.get_children(id).await?.into_iter().rev() {
            stack.push((child.id, false));
        }
    }

    let mut deleted = 0;
    for id in post_order {
        deleted += ops.delete_node(id).await?;
    }
    Ok(deleted)
}
