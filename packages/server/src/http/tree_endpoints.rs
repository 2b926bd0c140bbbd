//! Tree Endpoints
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /tree` - The whole forest
//! - `GET /tree/:id` - One node with its subtree
//! - `POST /tree` - Create a node
//! - `PUT /tree/:id` - Replace code, name and parent of a node
//! - `DELETE /tree/:id` - Delete a node and its descendants
//! - `POST /tree/bulk-insert?parent_id=` - Insert a nested batch atomically

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::http::{AppState, HttpError};
use divtree_core::models::{BulkNodeRequest, NewNode, Node, NodeId, NodeUpdate, TreeNode};
use divtree_core::services::ErrorKind;

/// Body of `POST /tree` and `PUT /tree/:id`
#[derive(Debug, Deserialize)]
pub struct NodePayload {
    /// Pre-assigned id; only honoured on create
    #[serde(default)]
    pub id: Option<NodeId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
pub struct BulkInsertQuery {
    pub parent_id: Option<NodeId>,
}

/// Confirmation body for delete and bulk insert
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn parse_id(raw: &str) -> Result<NodeId, HttpError> {
    raw.trim()
        .parse::<NodeId>()
        .map_err(|_| HttpError::invalid_id(raw))
}

async fn get_tree(State(state): State<AppState>) -> Result<Json<Vec<TreeNode>>, HttpError> {
    let forest = state.tree_service.get_tree().await?;
    Ok(Json(forest))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TreeNode>, HttpError> {
    let id = parse_id(&id)?;
    let tree = state.tree_service.get_node_by_id(id).await.map_err(|e| {
        let not_found = e.kind() == ErrorKind::NotFound;
        let err = HttpError::from(e);
        if not_found {
            err.with_status(StatusCode::NOT_FOUND)
        } else {
            err
        }
    })?;

    Ok(Json(tree))
}

async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NodePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let Json(payload) = payload.map_err(HttpError::from_json_rejection)?;

    let mut new_node = NewNode::new(payload.code, payload.name, payload.parent_id);
    if let Some(id) = payload.id {
        new_node = new_node.with_id(id);
    }

    let node = state.tree_service.create_node(new_node).await.map_err(|e| {
        tracing::warn!("Create rejected: {}", e);
        HttpError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(node)))
}

async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NodePayload>, JsonRejection>,
) -> Result<Json<Node>, HttpError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(HttpError::from_json_rejection)?;

    let update = NodeUpdate::new(payload.code, payload.name, payload.parent_id);
    let node = state.tree_service.update_node(id, update).await.map_err(|e| {
        tracing::warn!("Update of node {} rejected: {}", id, e);
        HttpError::from(e)
    })?;

    Ok(Json(node))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpError> {
    let id = parse_id(&id)?;
    state.tree_service.delete_node_with_children(id).await?;

    Ok(Json(MessageResponse {
        message: "Node and its children deleted successfully".to_string(),
        inserted: None,
    }))
}

async fn bulk_insert(
    State(state): State<AppState>,
    query: Result<Query<BulkInsertQuery>, QueryRejection>,
    payload: Result<Json<Vec<BulkNodeRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), HttpError> {
    let Query(query) = query.map_err(HttpError::from_query_rejection)?;
    let Json(requests) = payload.map_err(HttpError::from_json_rejection)?;

    let inserted = state
        .tree_service
        .bulk_insert(&requests, query.parent_id)
        .await
        .map_err(|e| {
            tracing::warn!("Bulk insert rolled back: {}", e);
            HttpError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Nodes inserted successfully".to_string(),
            inserted: Some(inserted),
        }),
    ))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tree", get(get_tree).post(create_node))
        .route("/tree/bulk-insert", post(bulk_insert))
        .route(
            "/tree/:id",
            get(get_node).put(update_node).delete(delete_node),
        )
        .with_state(state)
}
