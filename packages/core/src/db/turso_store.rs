//! TursoStore - NodeStore Implementation for Turso/libsql Backend
//!
//! This module implements the `NodeStore` trait on top of `DatabaseService`.
//!
//! # Design Principles
//!
//! 1. **Shared SQL**: All statements live in the row helpers below, which take
//!    a `&libsql::Connection`; the store and its transactions both delegate
//!    to them
//! 2. **Row Conversion**: Handles libsql::Row → Node model conversion
//! 3. **Dedicated transaction connection**: `begin()` opens a fresh
//!    connection and issues `BEGIN IMMEDIATE` on it, so the write lock is
//!    taken up front and all checks inside the transaction see a stable state
//!
//! # Examples
//!
//! ```rust,no_run
//! use divtree_core::db::{DatabaseService, NodeOps, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/divtree.db")).await?);
//!     let store = TursoStore::new(db);
//!
//!     let node = store.get_node_by_code("HQ").await?;
//!     Ok(())
//! }
//! ```

use crate::db::node_store::{NodeOps, NodeStore, StoreTransaction};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{NewNode, Node, NodeId, NodeUpdate};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::params::IntoParams;
use libsql::{Connection, Row};
use std::sync::Arc;

const NODE_COLUMNS: &str = "id, code, name, parent_id, created_at, updated_at";

/// TursoStore implements NodeStore trait for Turso/libsql backend
#[derive(Debug, Clone)]
pub struct TursoStore {
    /// Underlying database service (connection management + schema)
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapper
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Access the underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }
}

#[async_trait]
impl NodeOps for TursoStore {
    async fn get_all_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_all(&conn).await
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_by_id(&conn, id).await
    }

    async fn get_node_by_code(&self, code: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_by_code(&conn, code).await
    }

    async fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        select_children(&conn, parent_id).await
    }

    async fn insert_node(&self, node: &NewNode) -> Result<Node, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        insert_row(&conn, node).await
    }

    async fn update_node(
        &self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        update_row(&conn, id, update).await
    }

    async fn delete_node(&self, id: NodeId) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        delete_row(&conn, id).await
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(TursoTransaction { conn }))
    }
}

/// An open libsql transaction
///
/// Owns its connection exclusively. If it is dropped without `commit` the
/// connection closes and SQLite discards the pending writes.
pub struct TursoTransaction {
    conn: Connection,
}

#[async_trait]
impl NodeOps for TursoTransaction {
    async fn get_all_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        select_all(&self.conn).await
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        select_by_id(&self.conn, id).await
    }

    async fn get_node_by_code(&self, code: &str) -> Result<Option<Node>, DatabaseError> {
        select_by_code(&self.conn, code).await
    }

    async fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
        select_children(&self.conn, parent_id).await
    }

    async fn insert_node(&self, node: &NewNode) -> Result<Node, DatabaseError> {
        insert_row(&self.conn, node).await
    }

    async fn update_node(
        &self,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        update_row(&self.conn, id, update).await
    }

    async fn delete_node(&self, id: NodeId) -> Result<u64, DatabaseError> {
        delete_row(&self.conn, id).await
    }
}

#[async_trait]
impl StoreTransaction for TursoTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            let _rollback = self.conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }
}

//
// ROW HELPERS
// Shared by TursoStore (autocommit) and TursoTransaction.
//

async fn select_all(conn: &Connection) -> Result<Vec<Node>, DatabaseError> {
    query_nodes(
        conn,
        &format!("SELECT {} FROM nodes ORDER BY id ASC", NODE_COLUMNS),
        (),
    )
    .await
}

async fn select_by_id(conn: &Connection, id: NodeId) -> Result<Option<Node>, DatabaseError> {
    let nodes = query_nodes(
        conn,
        &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
        [id],
    )
    .await?;
    Ok(nodes.into_iter().next())
}

async fn select_by_code(conn: &Connection, code: &str) -> Result<Option<Node>, DatabaseError> {
    let nodes = query_nodes(
        conn,
        &format!("SELECT {} FROM nodes WHERE code = ?", NODE_COLUMNS),
        [code],
    )
    .await?;
    Ok(nodes.into_iter().next())
}

async fn select_children(conn: &Connection, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
    query_nodes(
        conn,
        &format!(
            "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY id ASC",
            NODE_COLUMNS
        ),
        [parent_id],
    )
    .await
}

async fn insert_row(conn: &Connection, node: &NewNode) -> Result<Node, DatabaseError> {
    let result = match node.id {
        Some(id) => {
            conn.execute(
                "INSERT INTO nodes (id, code, name, parent_id) VALUES (?, ?, ?, ?)",
                (id, node.code.as_str(), node.name.as_str(), node.parent_id),
            )
            .await
        }
        None => {
            conn.execute(
                "INSERT INTO nodes (code, name, parent_id) VALUES (?, ?, ?)",
                (node.code.as_str(), node.name.as_str(), node.parent_id),
            )
            .await
        }
    };

    result.map_err(|e| map_write_error(e, &node.code, "insert node"))?;

    let id = node.id.unwrap_or_else(|| conn.last_insert_rowid());
    select_by_id(conn, id).await?.ok_or_else(|| {
        DatabaseError::sql_execution(format!("Inserted node {} could not be read back", id))
    })
}

async fn update_row(
    conn: &Connection,
    id: NodeId,
    update: &NodeUpdate,
) -> Result<Option<Node>, DatabaseError> {
    let affected = conn
        .execute(
            "UPDATE nodes SET code = ?, name = ?, parent_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            (update.code.as_str(), update.name.as_str(), update.parent_id, id),
        )
        .await
        .map_err(|e| map_write_error(e, &update.code, "update node"))?;

    if affected == 0 {
        return Ok(None);
    }
    select_by_id(conn, id).await
}

async fn delete_row(conn: &Connection, id: NodeId) -> Result<u64, DatabaseError> {
    conn.execute("DELETE FROM nodes WHERE id = ?", [id])
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node {}: {}", id, e)))
}

async fn query_nodes(
    conn: &Connection,
    sql: &str,
    params: impl IntoParams + Send,
) -> Result<Vec<Node>, DatabaseError> {
    let mut rows = conn
        .query(sql, params)
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to query nodes: {}", e)))?;

    let mut nodes = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        nodes.push(row_to_node(&row)?);
    }
    Ok(nodes)
}

/// The UNIQUE index on `code` backs up the service-level duplicate check
fn map_write_error(e: libsql::Error, code: &str, action: &str) -> DatabaseError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed: nodes.code") {
        DatabaseError::unique_violation("code", code)
    } else {
        DatabaseError::sql_execution(format!("Failed to {}: {}", action, message))
    }
}

/// Convert libsql::Row to Node model
///
/// # Row Format
///
/// Expected columns (in order): id, code, name, parent_id (nullable),
/// created_at, updated_at
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get id: {}", e)))?;
    let code: String = row
        .get(1)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get code: {}", e)))?;
    let name: String = row
        .get(2)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get name: {}", e)))?;
    let parent_id: Option<i64> = row
        .get(3)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get parent_id: {}", e)))?;
    let created_at: String = row
        .get(4)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get created_at: {}", e)))?;
    let updated_at: String = row
        .get(5)
        .map_err(|e| DatabaseError::row_conversion(format!("Failed to get updated_at: {}", e)))?;

    Ok(Node {
        id,
        code,
        name,
        parent_id,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Parse timestamp from database - handles both SQLite and RFC3339 formats
///
/// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(DatabaseError::row_conversion(format!(
        "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
        s
    )))
}
