//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Every
//! variant maps to exactly one [`ErrorKind`], so callers can tell a rejected
//! mutation apart from a store fault without parsing messages.

use crate::db::DatabaseError;
use crate::models::{NodeId, ValidationError};
use thiserror::Error;

/// Coarse classification of a [`TreeServiceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateCode,
    DepthExceeded,
    IntegrityViolation,
    Validation,
    Store,
}

/// Tree service errors
///
/// None of these are retried by the service: they are either permanent
/// validation failures or store faults the caller must see.
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Referenced node id does not exist
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// Another node already uses this code
    #[error("Duplicate code is not allowed: {code}")]
    DuplicateCode { code: String },

    /// The operation would place a node deeper than the configured limit
    #[error("Hierarchy depth cannot exceed {max_depth} levels")]
    DepthExceeded { max_depth: usize },

    /// A cycle would be created, or a malformed chain was found while walking
    #[error("Integrity violation: {context}")]
    IntegrityViolation { context: String },

    /// Payload failed validation
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(DatabaseError),
}

impl TreeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a duplicate code error
    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode { code: code.into() }
    }

    /// Create a depth exceeded error
    pub fn depth_exceeded(max_depth: usize) -> Self {
        Self::DepthExceeded { max_depth }
    }

    /// Create an integrity violation error
    pub fn integrity_violation(context: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            context: context.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateCode { .. } => ErrorKind::DuplicateCode,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            Self::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            Self::ValidationFailed(_) => ErrorKind::Validation,
            Self::DatabaseError(_) => ErrorKind::Store,
        }
    }
}

impl From<DatabaseError> for TreeServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            // A racing writer got past the service check; the index caught it
            DatabaseError::UniqueViolation { column, value } if column == "code" => {
                Self::DuplicateCode { code: value }
            }
            other => Self::DatabaseError(other),
        }
    }
}
