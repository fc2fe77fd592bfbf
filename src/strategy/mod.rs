//! Strategy Module
//!
//! Classifies intercepted requests into caching strategies and executes them
//! against the bucket registry and the upstream fetcher.

mod execute;


pub use execute::{execute, StrategyContext};

use crate::http::FetchRequest;
use crate::manifest::StaticManifest;

// == Strategy ==
/// The caching strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from the static bucket, fetch on miss
    CacheFirst,
    /// Fetch upstream, fall back to the dynamic bucket
    NetworkFirst,
    /// NetworkFirst whose terminal fallback is the pre-cached offline page
    NetworkFirstWithOffline,
    /// Serve the cached entry immediately, refresh in the background
    StaleWhileRevalidate,
    /// Not intercepted; forwarded to the upstream untouched
    PassThrough,
}

// == Classification ==
/// Routes a request to exactly one strategy.
///
/// Pure function of (method, path, Accept header). Predicates are checked in
/// a fixed priority order; the first match wins:
///
/// 1. non-GET -> `PassThrough`
/// 2. exact static-manifest match -> `CacheFirst`
/// 3. path prefix `/api/` -> `NetworkFirst`
/// 4. `Accept` contains `text/html` -> `NetworkFirstWithOffline`
/// 5. everything else -> `StaleWhileRevalidate`
pub fn classify(request: &FetchRequest, manifest: &StaticManifest) -> Strategy {
    if !request.is_get() {
        return Strategy::PassThrough;
    }

    let path = request.path_only();
    if manifest.contains(path) {
        return Strategy::CacheFirst;
    }
    if path.starts_with("/api/") {
        return Strategy::NetworkFirst;
    }
    if request
        .header("accept")
        .is_some_and(|accept| accept.contains("text/html"))
    {
        return Strategy::NetworkFirstWithOffline;
    }
    Strategy::StaleWhileRevalidate
}
