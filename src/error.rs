//! Error types for the offline gateway
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Gateway Error Enum ==
/// Unified error type for the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Upstream unreachable or transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Cache bucket or sync queue storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Install-time manifest precache failure
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            // Offline failures surface the synthetic JSON body clients expect
            GatewayError::Network(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Sem conexão",
                    "message": msg,
                    "offline": true,
                })),
            )
                .into_response(),
            GatewayError::Storage(msg)
            | GatewayError::InstallFailed(msg)
            | GatewayError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": msg })),
            )
                .into_response(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the gateway.
pub type Result<T> = std::result::Result<T, GatewayError>;
