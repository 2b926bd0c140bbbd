//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `NodeStore` abstraction the services depend on
//! - `TursoStore`, the libsql implementation with transactional batches
//!
//! # Architecture
//!
//! Nodes live in one `nodes` table as an adjacency list (`parent_id` references
//! `nodes(id)`). The store performs plain row operations only; hierarchy rules
//! are enforced by the service layer, with the table's UNIQUE and FOREIGN KEY
//! constraints as the final backstop.

mod database;
mod error;
mod node_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use node_store::{NodeOps, NodeStore, StoreTransaction};
pub use turso_store::{TursoStore, TursoTransaction};
