//! Server configuration from environment variables
//!
//! - `DIVTREE_HOST`: bind address (default: 127.0.0.1)
//! - `DIVTREE_PORT`: port (default: 8123)
//! - `DIVTREE_DB_PATH`: database file (default: ./data/divtree.db)
//! - `DIVTREE_MAX_DEPTH`: hierarchy depth limit (default: 5)
//!
//! Unparseable values are logged and replaced by the default.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use divtree_core::services::DEFAULT_MAX_DEPTH;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8123;
pub const DEFAULT_DB_PATH: &str = "./data/divtree.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub max_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("DIVTREE_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = parse_or_default(&lookup, "DIVTREE_PORT", defaults.port);
        let db_path = lookup("DIVTREE_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let mut max_depth = parse_or_default(&lookup, "DIVTREE_MAX_DEPTH", defaults.max_depth);
        if max_depth == 0 {
            tracing::warn!(
                "DIVTREE_MAX_DEPTH must be at least 1, using default {}",
                DEFAULT_MAX_DEPTH
            );
            max_depth = DEFAULT_MAX_DEPTH;
        }

        Self {
            host,
            port,
            db_path,
            max_depth,
        }
    }

    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} value '{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}
