//! Offline Gateway - an offline-first caching HTTP gateway
//!
//! Intercepts requests, classifies them into service-worker style caching
//! strategies and serves them from versioned cache buckets, with a durable
//! background-sync queue for mutations that fail while offline.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod manifest;
pub mod models;
pub mod strategy;
pub mod sync;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_sync_task};
