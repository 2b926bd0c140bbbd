//! Division Tree Core Business Logic Layer
//!
//! This crate provides data management and integrity enforcement for a
//! self-referencing hierarchy of uniquely coded nodes ("divisions").
//!
//! # Architecture
//!
//! - **Adjacency list**: Nodes are flat rows with an optional `parent_id`
//! - **Bounded hierarchy**: At most five levels from a root to any node
//! - **No cycles**: Parent reassignments that would loop are rejected
//! - **libsql**: Embedded SQLite-compatible database with transactional batches
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, TreeNode, request shapes)
//! - [`db`] - Database layer with libsql integration and the `NodeStore` seam
//! - [`services`] - Integrity checker, tree assembler and `TreeService`

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService, NodeStore, TursoStore};
pub use models::*;
pub use services::*;
