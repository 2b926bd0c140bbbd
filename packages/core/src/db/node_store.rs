//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the traits that abstract persistence of node rows.
//! `TreeService` depends only on these traits, so the integrity rules can be
//! exercised against any backend that offers the same operations.
//!
//! # Architecture
//!
//! - **`NodeOps`**: Row-level operations (fetch, insert, update, delete)
//! - **`StoreTransaction`**: `NodeOps` bound to one open unit of work, plus
//!   `commit` / `rollback`
//! - **`NodeStore`**: Autocommit `NodeOps` plus `begin()` to open a transaction
//!
//! Because both the store and an open transaction implement `NodeOps`, the
//! integrity checker walks parent chains the same way inside or outside a
//! transaction. Checks performed on a transaction see the rows it has
//! already written.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async (libsql is async)
//! 2. **Typed errors**: Methods return `DatabaseError`; business rules live in
//!    the service layer
//! 3. **Natural order**: Multi-row fetches return rows in ascending `id`
//!    order, which the tree assembler preserves for siblings
//!
//! # Examples
//!
//! ```rust,no_run
//! use divtree_core::db::{DatabaseService, NodeOps, NodeStore, TursoStore};
//! use divtree_core::models::NewNode;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/divtree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let tx = store.begin().await?;
//!     tx.insert_node(&NewNode::new("HQ", "Head Office", None)).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{NewNode, Node, NodeId, NodeUpdate};
use async_trait::async_trait;

/// Row-level node operations shared by the store and its transactions
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so service futures can move between
/// Tokio worker threads.
#[async_trait]
pub trait NodeOps: Send + Sync {
    /// Fetch every node, in ascending `id` order
    async fn get_all_nodes(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Get node by ID
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// Get node by its unique code
    async fn get_node_by_code(&self, code: &str) -> Result<Option<Node>, DatabaseError>;

    /// Direct children of `parent_id`, in ascending `id` order
    async fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError>;

    /// Insert a node and return the stored row with its assigned id and timestamps
    ///
    /// # Errors
    ///
    /// - `DatabaseError::UniqueViolation` if `code` is already taken
    /// - Foreign key failure if `parent_id` does not reference an existing node
    async fn insert_node(&self, node: &NewNode) -> Result<Node, DatabaseError>;

    /// Overwrite code, name and parent of an existing node
    ///
    /// Returns `Ok(None)` if no row has this id. The modification timestamp
    /// is refreshed by the store.
    async fn update_node(
        &self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError>;

    /// Delete one row by id
    ///
    /// Returns the number of rows affected (0 = node didn't exist).
    async fn delete_node(&self, id: NodeId) -> Result<u64, DatabaseError>;
}

/// An open unit of work
///
/// Every `NodeOps` call made through the transaction is part of the same
/// atomic unit. Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: NodeOps {
    /// Make all writes of this transaction durable
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    /// Discard all writes of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Abstraction layer for node persistence
///
/// Direct `NodeOps` calls on the store autocommit individually; use
/// [`NodeStore::begin`] to group several calls atomically.
#[async_trait]
pub trait NodeStore: NodeOps {
    /// Begin a write transaction
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError>;
}
