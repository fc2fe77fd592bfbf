//! HTTP Module
//!
//! Wire types for intercepted requests and stored responses, plus the
//! upstream fetch wrapper.

mod fetcher;
mod types;

// Re-export public types
pub use fetcher::{Fetcher, HttpFetcher};
pub use types::{FetchRequest, StoredResponse};
