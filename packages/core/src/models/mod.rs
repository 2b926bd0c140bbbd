//! Data Models
//!
//! This module contains the data structures used throughout the division tree:
//!
//! - `Node` - Persisted row of the `nodes` table
//! - `NewNode` / `NodeUpdate` - Inputs for single-node create and update
//! - `BulkNodeRequest` - Nested input for atomic subtree insertion
//! - `TreeNode` - A node with its assembled subtree, as returned to readers

mod node;

pub use node::{BulkNodeRequest, NewNode, Node, NodeId, NodeUpdate, TreeNode, ValidationError};
