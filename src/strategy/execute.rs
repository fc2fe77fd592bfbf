//! Strategy execution.
//!
//! Each strategy takes the injected bucket registry and fetcher through a
//! `StrategyContext`; nothing is reached through globals. Only
//! `StaleWhileRevalidate` may return an error (failure propagation with no
//! further fallback); every other strategy degrades to a synthetic response.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{BucketRegistry, CacheStats};
use crate::error::Result;
use crate::http::{FetchRequest, Fetcher, StoredResponse};
use crate::manifest::OFFLINE_PAGE;
use crate::strategy::Strategy;

// == Strategy Context ==
/// Shared dependencies handed to every strategy invocation.
#[derive(Clone)]
pub struct StrategyContext {
    /// All live cache generations
    pub registry: Arc<RwLock<BucketRegistry>>,
    /// Upstream fetch seam
    pub fetcher: Arc<dyn Fetcher>,
    /// Hit/miss counters
    pub stats: Arc<RwLock<CacheStats>>,
    /// Name of the current static generation
    pub static_bucket: String,
    /// Name of the current dynamic generation
    pub dynamic_bucket: String,
}

// == Dispatch ==
/// Runs the given strategy for an intercepted GET request.
///
/// `PassThrough` requests never reach this function; the API layer forwards
/// them directly.
pub async fn execute(
    ctx: &StrategyContext,
    strategy: Strategy,
    request: &FetchRequest,
) -> Result<StoredResponse> {
    match strategy {
        Strategy::CacheFirst => cache_first(ctx, request).await,
        Strategy::NetworkFirst => network_first(ctx, request, false).await,
        Strategy::NetworkFirstWithOffline => network_first(ctx, request, true).await,
        Strategy::StaleWhileRevalidate => stale_while_revalidate(ctx, request).await,
        Strategy::PassThrough => ctx.fetcher.fetch(request).await,
    }
}

// == Cache First ==
/// Static-bucket lookup; on miss fetch upstream and populate lazily.
async fn cache_first(ctx: &StrategyContext, request: &FetchRequest) -> Result<StoredResponse> {
    let identity = request.identity();

    let cached = {
        let registry = ctx.registry.read().await;
        registry
            .get(&ctx.static_bucket)
            .and_then(|bucket| bucket.get(&identity))
            .map(|entry| entry.response.clone())
    };
    if let Some(response) = cached {
        ctx.stats.write().await.record_hit();
        return Ok(response);
    }

    ctx.stats.write().await.record_miss();
    match ctx.fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                let mut registry = ctx.registry.write().await;
                registry
                    .open(&ctx.static_bucket)
                    .put(identity, response.clone());
            }
            Ok(response)
        }
        Err(err) => {
            warn!(path = %request.path, error = %err, "cache-first miss with upstream down");
            Ok(offline_asset_fallback())
        }
    }
}

// == Network First ==
/// Upstream fetch first; on transport failure fall back to the dynamic
/// bucket, then to a synthetic offline body (JSON, or the pre-cached offline
/// page when `offline_page_fallback` is set).
async fn network_first(
    ctx: &StrategyContext,
    request: &FetchRequest,
    offline_page_fallback: bool,
) -> Result<StoredResponse> {
    let identity = request.identity();

    match ctx.fetcher.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                let mut registry = ctx.registry.write().await;
                registry
                    .open(&ctx.dynamic_bucket)
                    .put(identity, response.clone());
            }
            Ok(response)
        }
        Err(err) => {
            debug!(path = %request.path, error = %err, "network-first falling back to cache");

            let cached = {
                let registry = ctx.registry.read().await;
                registry
                    .get(&ctx.dynamic_bucket)
                    .and_then(|bucket| bucket.get(&identity))
                    .map(|entry| entry.response.clone())
            };
            if let Some(response) = cached {
                ctx.stats.write().await.record_hit();
                return Ok(response);
            }

            ctx.stats.write().await.record_miss();
            if offline_page_fallback {
                if let Some(page) = offline_page(ctx).await {
                    return Ok(page);
                }
            }
            Ok(offline_json_fallback())
        }
    }
}

// == Stale While Revalidate ==
/// Returns the cached entry immediately and refreshes it in the background.
/// Without a cached entry the network outcome is propagated as-is.
async fn stale_while_revalidate(
    ctx: &StrategyContext,
    request: &FetchRequest,
) -> Result<StoredResponse> {
    let identity = request.identity();

    let stale = {
        let registry = ctx.registry.read().await;
        registry
            .get(&ctx.dynamic_bucket)
            .and_then(|bucket| bucket.get(&identity))
            .map(|entry| entry.response.clone())
    };

    match stale {
        Some(response) => {
            ctx.stats.write().await.record_hit();
            // Fire-and-forget: the stale response is returned before the
            // refresh completes
            let ctx = ctx.clone();
            let request = request.clone();
            tokio::spawn(async move {
                revalidate(&ctx, &request).await;
            });
            Ok(response)
        }
        None => {
            ctx.stats.write().await.record_miss();
            let response = ctx.fetcher.fetch(request).await?;
            if response.is_ok() {
                let mut registry = ctx.registry.write().await;
                registry
                    .open(&ctx.dynamic_bucket)
                    .put(identity, response.clone());
            }
            Ok(response)
        }
    }
}

/// Background refresh of a dynamic-bucket entry.
async fn revalidate(ctx: &StrategyContext, request: &FetchRequest) {
    match ctx.fetcher.fetch(request).await {
        Ok(response) if response.is_ok() => {
            let mut registry = ctx.registry.write().await;
            registry
                .open(&ctx.dynamic_bucket)
                .put(request.identity(), response);
            drop(registry);
            ctx.stats.write().await.record_revalidation();
        }
        Ok(response) => {
            debug!(path = %request.path, status = response.status, "revalidation kept stale entry");
        }
        Err(err) => {
            debug!(path = %request.path, error = %err, "revalidation failed");
        }
    }
}

// == Synthetic Fallbacks ==
/// 503 plain-text body for uncached static assets while offline.
fn offline_asset_fallback() -> StoredResponse {
    StoredResponse::new(
        503,
        "text/plain; charset=utf-8",
        "Recurso não disponível offline",
    )
}

/// 503 JSON body for uncached API responses while offline.
fn offline_json_fallback() -> StoredResponse {
    let body = json!({
        "error": "Sem conexão",
        "message": "Você está offline e este conteúdo não está em cache",
        "offline": true,
    });
    StoredResponse::new(503, "application/json", body.to_string())
}

/// The pre-cached offline document, if install put it in the static bucket.
async fn offline_page(ctx: &StrategyContext) -> Option<StoredResponse> {
    let registry = ctx.registry.read().await;
    registry
        .get(&ctx.static_bucket)
        .and_then(|bucket| bucket.get(&format!("GET {OFFLINE_PAGE}")))
        .map(|entry| entry.response.clone())
}
