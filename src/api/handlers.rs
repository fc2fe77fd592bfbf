//! API Handlers
//!
//! The proxy handler intercepts every request outside `/_sw/` and routes it
//! through the strategy selector; the `/_sw/` handlers expose the control
//! channel, stats and health.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::{BucketRegistry, CacheStats};
use crate::config::Config;
use crate::error::Result;
use crate::http::{FetchRequest, Fetcher, StoredResponse};
use crate::lifecycle::Lifecycle;
use crate::manifest::StaticManifest;
use crate::models::{ControlMessage, HealthResponse, StatsResponse};
use crate::strategy::{classify, execute, Strategy, StrategyContext};
use crate::sync::MutationStore;

// Hop-by-hop headers never replayed to clients
const HOP_BY_HOP: &[&str] = &["connection", "keep-alive", "transfer-encoding", "content-length"];

/// Application state shared across all handlers.
///
/// Every dependency is injected: the bucket registry, the upstream fetcher
/// and the mutation store are all swappable in tests.
#[derive(Clone)]
pub struct AppState {
    /// All live cache generations
    pub registry: Arc<RwLock<BucketRegistry>>,
    /// Upstream fetch seam
    pub fetcher: Arc<dyn Fetcher>,
    /// Lifecycle state machine
    pub lifecycle: Arc<RwLock<Lifecycle>>,
    /// Static asset manifest
    pub manifest: Arc<StaticManifest>,
    /// Hit/miss counters
    pub stats: Arc<RwLock<CacheStats>>,
    /// Pending-mutation queue
    pub mutations: Arc<dyn MutationStore>,
    /// Name of the current static generation
    pub static_bucket: String,
    /// Name of the current dynamic generation
    pub dynamic_bucket: String,
}

impl AppState {
    /// Creates application state for the given version and manifest.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        mutations: Arc<dyn MutationStore>,
        version: &str,
        manifest: StaticManifest,
    ) -> Self {
        let lifecycle = Lifecycle::new(version);
        let static_bucket = lifecycle.static_bucket().to_string();
        let dynamic_bucket = lifecycle.dynamic_bucket().to_string();
        Self {
            registry: Arc::new(RwLock::new(BucketRegistry::new())),
            fetcher,
            lifecycle: Arc::new(RwLock::new(lifecycle)),
            manifest: Arc::new(manifest),
            stats: Arc::new(RwLock::new(CacheStats::new())),
            mutations,
            static_bucket,
            dynamic_bucket,
        }
    }

    /// Creates application state from configuration plus injected backends.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        mutations: Arc<dyn MutationStore>,
    ) -> Self {
        Self::new(
            fetcher,
            mutations,
            &config.version,
            StaticManifest::new(config.static_manifest.clone()),
        )
    }

    /// Precaches the static manifest (lifecycle install transition).
    pub async fn install(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.write().await;
        lifecycle
            .on_install(&self.registry, self.fetcher.as_ref(), &self.manifest)
            .await
    }

    /// Garbage-collects previous generations (lifecycle activate transition).
    pub async fn activate(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.write().await;
        lifecycle.on_activate(&self.registry).await
    }

    fn strategy_context(&self) -> StrategyContext {
        StrategyContext {
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            stats: self.stats.clone(),
            static_bucket: self.static_bucket.clone(),
            dynamic_bucket: self.dynamic_bucket.clone(),
        }
    }
}

// == Proxy Handler ==
/// Fallback handler: classifies the intercepted request and serves it
/// through the selected caching strategy.
///
/// Non-GET requests pass through to the upstream; when the upstream is
/// unreachable the mutation is persisted for background replay and the
/// caller receives the synthetic offline body.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request = build_fetch_request(&method, &uri, &headers, &body);
    let strategy = classify(&request, &state.manifest);

    if strategy == Strategy::PassThrough {
        return pass_through(&state, &request).await;
    }

    let ctx = state.strategy_context();
    let response = execute(&ctx, strategy, &request).await?;
    Ok(to_response(response))
}

/// Forwards a non-GET request; enqueues it for background sync when the
/// upstream is unreachable.
async fn pass_through(state: &AppState, request: &FetchRequest) -> Result<Response> {
    match state.fetcher.fetch(request).await {
        Ok(response) => Ok(to_response(response)),
        Err(err) => {
            warn!(
                method = %request.method,
                path = %request.path,
                error = %err,
                "mutation failed, queueing for background sync"
            );
            state.mutations.enqueue(request)?;
            state.stats.write().await.record_queued_mutation();

            let body = json!({
                "error": "Sem conexão",
                "message": "Sua alteração foi salva e será sincronizada quando a conexão voltar",
                "offline": true,
                "queued": true,
            });
            Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response())
        }
    }
}

// == Control Channel Handler ==
/// Handler for POST /_sw/message
///
/// `SKIP_WAITING` is acknowledged with 204 No Content; `GET_VERSION`
/// replies with the current version string.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<ControlMessage>,
) -> Response {
    let mut lifecycle = state.lifecycle.write().await;
    match lifecycle.on_message(message) {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// == Stats Handler ==
/// Handler for GET /_sw/stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.stats.read().await.clone();
    let registry = state.registry.read().await;
    let static_entries = registry.get(&state.static_bucket).map_or(0, |b| b.len());
    let dynamic_entries = registry.get(&state.dynamic_bucket).map_or(0, |b| b.len());
    let pending = state.mutations.pending_count()?;

    Ok(Json(StatsResponse::new(
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.revalidations,
        static_entries,
        dynamic_entries,
        pending,
    )))
}

// == Health Handler ==
/// Handler for GET /_sw/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let lifecycle = state.lifecycle.read().await;
    Json(HealthResponse::healthy(lifecycle.state().to_string()))
}

// == Conversions ==
fn build_fetch_request(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> FetchRequest {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    FetchRequest {
        method: method.as_str().to_string(),
        path,
        headers,
        body: body.to_vec(),
    }
}

fn to_response(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in &stored.headers {
        if HOP_BY_HOP.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
        .body(axum::body::Body::from(stored.body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}
