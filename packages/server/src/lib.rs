//! HTTP surface for the division tree
//!
//! Wires a [`divtree_core::TreeService`] into an axum router. The binary in
//! `main.rs` only reads configuration, initializes logging and calls
//! [`http::start_server`].

pub mod config;
pub mod http;

pub use config::ServerConfig;
pub use http::{create_router, start_server, AppState, HttpError};
