//! HTTP server for the division tree
//!
//! # Endpoints
//!
//! See [`tree_endpoints`] for the route table. All handlers share one
//! [`TreeService`]; concurrency between requests is left to the store's
//! transactions.
//!
//! # Usage
//!
//! ```bash
//! DIVTREE_PORT=8123 RUST_LOG=debug cargo run --bin divtree-server
//! ```

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use divtree_core::services::TreeService;

mod http_error;
pub mod tree_endpoints;

pub use http_error::{error_code, HttpError};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub tree_service: Arc<TreeService>,
}

impl AppState {
    pub fn new(tree_service: TreeService) -> Self {
        Self {
            tree_service: Arc::new(tree_service),
        }
    }
}

/// Create the application router with request tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(tree_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped
///
/// # Errors
///
/// Returns error if the listener cannot bind or the server fails.
pub async fn start_server(addr: &str, tree_service: TreeService) -> anyhow::Result<()> {
    let app = create_router(AppState::new(tree_service));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
