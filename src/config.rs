//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;

use crate::manifest::DEFAULT_STATIC_ASSETS;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream origin the gateway fronts
    pub upstream_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Deployed application version, used to name cache generations
    pub version: String,
    /// TTL sweep interval in seconds
    pub cleanup_interval: u64,
    /// Maximum age in seconds for dynamic cache entries (TTL sweep threshold)
    pub dynamic_max_age: u64,
    /// Background sync drain interval in seconds
    pub sync_interval: u64,
    /// Path of the SQLite file backing the pending-mutation queue
    pub queue_db_path: String,
    /// Upstream request timeout in seconds
    pub fetch_timeout: u64,
    /// Asset paths precached at install time
    pub static_manifest: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_URL` - Upstream origin base URL (default: http://localhost:8080)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `APP_VERSION` - Version string for cache generation names (default: 1.1.0)
    /// - `CLEANUP_INTERVAL` - TTL sweep frequency in seconds (default: 3600)
    /// - `DYNAMIC_MAX_AGE` - Dynamic entry max age in seconds (default: 7 days)
    /// - `SYNC_INTERVAL` - Sync queue drain frequency in seconds (default: 60)
    /// - `QUEUE_DB_PATH` - SQLite path for the mutation queue (default: offline_queue.db)
    /// - `FETCH_TIMEOUT` - Upstream request timeout in seconds (default: 10)
    /// - `STATIC_MANIFEST` - Comma-separated asset paths (default: built-in list)
    pub fn from_env() -> Self {
        Self {
            upstream_url: env::var("UPSTREAM_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            version: env::var("APP_VERSION").unwrap_or_else(|_| "1.1.0".to_string()),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            dynamic_max_age: env::var("DYNAMIC_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7 * 24 * 60 * 60),
            sync_interval: env::var("SYNC_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            queue_db_path: env::var("QUEUE_DB_PATH")
                .unwrap_or_else(|_| "offline_queue.db".to_string()),
            fetch_timeout: env::var("FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            static_manifest: env::var("STATIC_MANIFEST")
                .map(|v| {
                    v.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| default_manifest()),
        }
    }
}

fn default_manifest() -> Vec<String> {
    DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:8080".to_string(),
            server_port: 3000,
            version: "1.1.0".to_string(),
            cleanup_interval: 3600,
            dynamic_max_age: 7 * 24 * 60 * 60,
            sync_interval: 60,
            queue_db_path: "offline_queue.db".to_string(),
            fetch_timeout: 10,
            static_manifest: default_manifest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.upstream_url, "http://localhost:8080");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.version, "1.1.0");
        assert_eq!(config.dynamic_max_age, 604_800);
        assert!(config.static_manifest.contains(&"/offline.html".to_string()));
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("UPSTREAM_URL");
        env::remove_var("SERVER_PORT");
        env::remove_var("APP_VERSION");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("DYNAMIC_MAX_AGE");
        env::remove_var("SYNC_INTERVAL");
        env::remove_var("QUEUE_DB_PATH");
        env::remove_var("FETCH_TIMEOUT");
        env::remove_var("STATIC_MANIFEST");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 3600);
        assert_eq!(config.sync_interval, 60);
        assert_eq!(config.fetch_timeout, 10);
    }
}
