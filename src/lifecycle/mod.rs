//! Lifecycle Module
//!
//! Explicit finite-state machine for the gateway's install/activate
//! lifecycle and its control channel. Transitions are typed functions
//! returning `Result`; no ambient event objects.

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{dynamic_bucket_name, static_bucket_name, Bucket, BucketRegistry};
use crate::error::{GatewayError, Result};
use crate::http::{FetchRequest, Fetcher};
use crate::manifest::StaticManifest;
use crate::models::{ControlMessage, VersionReply};

// == Lifecycle State ==
/// Lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Precaching the static manifest
    Installing,
    /// Manifest fully precached, activation pending
    Installed,
    /// Garbage-collecting previous cache generations
    Activating,
    /// Serving traffic with the current generations
    Activated,
    /// Install failed; a restart retries it
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Installed => write!(f, "installed"),
            LifecycleState::Activating => write!(f, "activating"),
            LifecycleState::Activated => write!(f, "activated"),
            LifecycleState::Failed => write!(f, "failed"),
        }
    }
}

// == Lifecycle ==
/// Owns the lifecycle state and the names of the current cache generations.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
    static_bucket: String,
    dynamic_bucket: String,
    skip_waiting: bool,
}

impl Lifecycle {
    /// Creates a lifecycle for the given deployed version.
    pub fn new(version: &str) -> Self {
        Self {
            state: LifecycleState::Installing,
            static_bucket: static_bucket_name(version),
            dynamic_bucket: dynamic_bucket_name(version),
            skip_waiting: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Name of the current static generation.
    pub fn static_bucket(&self) -> &str {
        &self.static_bucket
    }

    /// Name of the current dynamic generation.
    pub fn dynamic_bucket(&self) -> &str {
        &self.dynamic_bucket
    }

    /// Whether immediate activation has been requested.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    // == Install ==
    /// Precaches the full static manifest, all-or-nothing.
    ///
    /// Every manifest path is fetched into a staged bucket first; the bucket
    /// is committed to the registry only once every fetch succeeded with a
    /// 2xx. A single failure fails the install, leaves no static bucket
    /// behind and moves the lifecycle to `Failed`. On success the
    /// skip-waiting flag is set so activation proceeds without waiting.
    pub async fn on_install(
        &mut self,
        registry: &RwLock<BucketRegistry>,
        fetcher: &dyn Fetcher,
        manifest: &StaticManifest,
    ) -> Result<()> {
        self.state = LifecycleState::Installing;
        info!(bucket = %self.static_bucket, assets = manifest.len(), "installing");

        let mut staged = Bucket::new(&self.static_bucket);
        for path in manifest.paths() {
            let request = FetchRequest::get(path);
            let response = match fetcher.fetch(&request).await {
                Ok(response) if response.is_ok() => response,
                Ok(response) => {
                    self.state = LifecycleState::Failed;
                    warn!(path, status = response.status, "install aborted");
                    return Err(GatewayError::InstallFailed(format!(
                        "precache of {path} returned status {}",
                        response.status
                    )));
                }
                Err(err) => {
                    self.state = LifecycleState::Failed;
                    warn!(path, error = %err, "install aborted");
                    return Err(GatewayError::InstallFailed(format!(
                        "precache of {path} failed: {err}"
                    )));
                }
            };
            staged.put(request.identity(), response);
        }

        registry.write().await.insert(staged);
        self.skip_waiting = true;
        self.state = LifecycleState::Installed;
        info!(bucket = %self.static_bucket, "install complete, skipping waiting phase");
        Ok(())
    }

    // == Activate ==
    /// Deletes every bucket that belongs to a previous generation, keeping
    /// only the current static and dynamic buckets.
    pub async fn on_activate(&mut self, registry: &RwLock<BucketRegistry>) -> Result<()> {
        if self.state == LifecycleState::Failed {
            return Err(GatewayError::InstallFailed(
                "cannot activate a failed install".to_string(),
            ));
        }
        self.state = LifecycleState::Activating;

        let mut registry = registry.write().await;
        for name in registry.names() {
            if name != self.static_bucket && name != self.dynamic_bucket {
                registry.delete(&name);
                info!(bucket = %name, "deleted stale cache generation");
            }
        }

        self.state = LifecycleState::Activated;
        info!(version = %self.static_bucket, "activated");
        Ok(())
    }

    // == Control Channel ==
    /// Handles a control message. `SKIP_WAITING` has no reply; `GET_VERSION`
    /// replies with the current static bucket name.
    pub fn on_message(&mut self, message: ControlMessage) -> Option<VersionReply> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting = true;
                info!("skip-waiting requested");
                None
            }
            ControlMessage::GetVersion => Some(VersionReply {
                version: self.static_bucket.clone(),
            }),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::http::StoredResponse;

    /// Fetcher that fails for a configurable set of paths.
    struct ManifestFetcher {
        failing_paths: HashSet<String>,
    }

    impl ManifestFetcher {
        fn new() -> Self {
            Self {
                failing_paths: HashSet::new(),
            }
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing_paths.insert(path.to_string());
            self
        }
    }

    #[async_trait]
    impl Fetcher for ManifestFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse> {
            if self.failing_paths.contains(&request.path) {
                return Err(GatewayError::Network("unreachable".to_string()));
            }
            Ok(StoredResponse::new(200, "text/html", request.path.clone()))
        }
    }

    fn manifest() -> StaticManifest {
        StaticManifest::new(vec!["/".to_string(), "/offline.html".to_string()])
    }

    #[tokio::test]
    async fn test_install_populates_static_bucket_and_skips_waiting() {
        let registry = RwLock::new(BucketRegistry::new());
        let mut lifecycle = Lifecycle::new("1.1.0");

        lifecycle
            .on_install(&registry, &ManifestFetcher::new(), &manifest())
            .await
            .unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Installed);
        assert!(lifecycle.skip_waiting());

        let registry = registry.read().await;
        let bucket = registry.get("re-educa-static-v1.1.0").unwrap();
        assert_eq!(bucket.len(), 2);
        assert!(bucket.get("GET /").is_some());
        assert!(bucket.get("GET /offline.html").is_some());
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let registry = RwLock::new(BucketRegistry::new());
        let mut lifecycle = Lifecycle::new("1.1.0");
        let fetcher = ManifestFetcher::new().failing("/offline.html");

        let result = lifecycle.on_install(&registry, &fetcher, &manifest()).await;

        assert!(matches!(result, Err(GatewayError::InstallFailed(_))));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        // No partially populated bucket left behind
        assert!(registry.read().await.names().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_on_non_2xx_precache() {
        struct ServerError;

        #[async_trait]
        impl Fetcher for ServerError {
            async fn fetch(&self, _request: &FetchRequest) -> Result<StoredResponse> {
                Ok(StoredResponse::new(500, "text/plain", "boom"))
            }
        }

        let registry = RwLock::new(BucketRegistry::new());
        let mut lifecycle = Lifecycle::new("1.1.0");

        let result = lifecycle.on_install(&registry, &ServerError, &manifest()).await;

        assert!(matches!(result, Err(GatewayError::InstallFailed(_))));
        assert!(registry.read().await.names().is_empty());
    }

    #[tokio::test]
    async fn test_activate_deletes_previous_generations() {
        let registry = RwLock::new(BucketRegistry::new());
        {
            let mut reg = registry.write().await;
            reg.open("re-educa-static-v1");
            reg.open("re-educa-dynamic-v1");
        }

        let mut lifecycle = Lifecycle::new("2");
        lifecycle
            .on_install(&registry, &ManifestFetcher::new(), &manifest())
            .await
            .unwrap();
        lifecycle.on_activate(&registry).await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Activated);
        let names = registry.read().await.names();
        assert!(names.contains(&"re-educa-static-v2".to_string()));
        assert!(!names.contains(&"re-educa-static-v1".to_string()));
        assert!(!names.contains(&"re-educa-dynamic-v1".to_string()));
    }

    #[tokio::test]
    async fn test_activate_after_failed_install_is_rejected() {
        let registry = RwLock::new(BucketRegistry::new());
        let mut lifecycle = Lifecycle::new("1.1.0");
        let fetcher = ManifestFetcher::new().failing("/");

        let _ = lifecycle.on_install(&registry, &fetcher, &manifest()).await;
        let result = lifecycle.on_activate(&registry).await;

        assert!(matches!(result, Err(GatewayError::InstallFailed(_))));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
    }

    #[tokio::test]
    async fn test_get_version_reports_static_bucket_name() {
        let mut lifecycle = Lifecycle::new("1.1.0");
        let reply = lifecycle.on_message(ControlMessage::GetVersion).unwrap();
        assert_eq!(reply.version, "re-educa-static-v1.1.0");
    }

    #[tokio::test]
    async fn test_skip_waiting_message_sets_flag_without_reply() {
        let mut lifecycle = Lifecycle::new("1.1.0");
        assert!(!lifecycle.skip_waiting());

        let reply = lifecycle.on_message(ControlMessage::SkipWaiting);
        assert!(reply.is_none());
        assert!(lifecycle.skip_waiting());
    }

    #[tokio::test]
    async fn test_install_works_through_dyn_fetcher() {
        // The fetcher seam must stay object safe
        let fetcher: Arc<dyn Fetcher> = Arc::new(ManifestFetcher::new());
        let registry = RwLock::new(BucketRegistry::new());
        let mut lifecycle = Lifecycle::new("1.1.0");

        lifecycle
            .on_install(&registry, fetcher.as_ref(), &manifest())
            .await
            .unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Installed);
    }
}
