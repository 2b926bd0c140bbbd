//! Business Services
//!
//! This module contains the tree business logic:
//!
//! - `IntegrityChecker` - Depth computation and circular reference detection
//! - `tree_assembler` - Flat node list → nested forest
//! - `TreeService` - Create/read/update/delete and atomic bulk insertion
//!
//! Services coordinate between the database layer and callers, enforcing the
//! hierarchy rules before anything is written.

pub mod error;
pub mod integrity;
pub mod tree_assembler;
pub mod tree_service;

pub use error::{ErrorKind, TreeServiceError};
pub use integrity::{IntegrityChecker, DEFAULT_MAX_DEPTH};
pub use tree_assembler::{assemble, assemble_single};
pub use tree_service::{TreeConfig, TreeService};
