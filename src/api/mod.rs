//! API Module
//!
//! Axum router and handlers for the proxy surface and the control channel.

mod handlers;
mod routes;

pub use handlers::AppState;
pub use routes::create_router;
