//! Node Data Structures
//!
//! This module defines the `Node` row type and the request/response shapes
//! built around it.
//!
//! # Architecture
//!
//! - **Adjacency list**: Every node stores an optional `parent_id`; the
//!   hierarchy is rebuilt in memory by the tree assembler
//! - **Global codes**: `code` is unique across the whole table, whatever the
//!   node's position in the hierarchy
//! - **Store-owned identity**: `id`, `created_at` and `updated_at` are
//!   assigned by the database
//!
//! # Examples
//!
//! ```rust
//! use divtree_core::models::{BulkNodeRequest, NewNode};
//!
//! // A root division
//! let root = NewNode::new("HQ", "Head Office", None);
//! assert!(root.validate().is_ok());
//!
//! // A nested batch for bulk insertion
//! let batch = BulkNodeRequest::new("FIN", "Finance")
//!     .with_children(vec![BulkNodeRequest::new("FIN-AP", "Accounts Payable")]);
//! assert_eq!(batch.list_division.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned node identifier
pub type NodeId = i64;

/// Validation errors for node payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Node cannot be its own parent: {0}")]
    SelfParent(NodeId),
}

/// A persisted node.
///
/// # Fields
///
/// - `id`: Unique identifier assigned by the store, immutable after creation
/// - `code`: Globally unique code
/// - `name`: Display label (not unique)
/// - `parent_id`: Optional reference to the parent node (`None` = root)
/// - `created_at`: Creation timestamp (set by the store)
/// - `updated_at`: Last modification timestamp (maintained by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    pub code: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Whether this node sits at the top of the hierarchy
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for single-node creation.
///
/// `id` may be supplied by callers that pre-assign identifiers; it is
/// normally left empty so the store assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,

    pub code: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl NewNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: None,
            code: code.into(),
            name: name.into(),
            parent_id,
        }
    }

    /// Pre-assign the identifier of the node being created
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Check required fields and the self-parent rule
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_labels(&self.code, &self.name)?;
        if let (Some(id), Some(parent_id)) = (self.id, self.parent_id) {
            if id == parent_id {
                return Err(ValidationError::SelfParent(id));
            }
        }
        Ok(())
    }
}

/// Replacement values for an existing node.
///
/// All three mutable fields are overwritten; a missing `parent_id` moves the
/// node to the root of the forest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub code: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl NodeUpdate {
    pub fn new(code: impl Into<String>, name: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            parent_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_labels(&self.code, &self.name)
    }
}

/// One item of a nested bulk-insert request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkNodeRequest {
    pub code: String,

    pub name: String,

    #[serde(default)]
    pub list_division: Vec<BulkNodeRequest>,
}

impl BulkNodeRequest {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            list_division: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BulkNodeRequest>) -> Self {
        self.list_division = children;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_labels(&self.code, &self.name)
    }

    /// Total number of items in this request, including nested children
    pub fn total_count(&self) -> usize {
        1 + self
            .list_division
            .iter()
            .map(BulkNodeRequest::total_count)
            .sum::<usize>()
    }
}

/// A node together with its assembled subtree.
///
/// Serializes as the flat node fields plus `list_division`, which is left
/// out entirely for leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_division: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            list_division: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, the node itself included
    pub fn size(&self) -> usize {
        1 + self.list_division.iter().map(TreeNode::size).sum::<usize>()
    }
}

fn validate_labels(code: &str, name: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        return Err(ValidationError::MissingField("code".to_string()));
    }
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()));
    }
    Ok(())
}
