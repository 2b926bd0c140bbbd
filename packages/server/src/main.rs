//! Division Tree HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (127.0.0.1:8123, ./data/divtree.db)
//! cargo run --bin divtree-server
//!
//! # Custom port and database
//! DIVTREE_PORT=9000 DIVTREE_DB_PATH=/tmp/tree.db cargo run --bin divtree-server
//! ```
//!
//! # Environment Variables
//!
//! - `DIVTREE_HOST`, `DIVTREE_PORT`, `DIVTREE_DB_PATH`, `DIVTREE_MAX_DEPTH`
//!   (see [`divtree_server::config`])
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::sync::Arc;

use divtree_core::db::{DatabaseService, TursoStore};
use divtree_core::services::{TreeConfig, TreeService};
use divtree_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Division tree server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.db_path.display());
    tracing::info!("Max depth: {}", config.max_depth);

    let db = DatabaseService::new(config.db_path.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;
    let store = Arc::new(TursoStore::new(Arc::new(db)));
    let tree_service = TreeService::with_config(
        store,
        TreeConfig {
            max_depth: config.max_depth,
        },
    );

    start_server(&config.bind_addr(), tree_service).await?;

    Ok(())
}
