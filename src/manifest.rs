//! Static Manifest Module
//!
//! The build-time list of asset paths that must be present in the static
//! bucket after a successful install.

/// Default asset list baked in at build time.
pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/offline.html",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
    "/assets/index.css",
    "/assets/index.js",
];

/// Path of the pre-cached offline fallback document.
pub const OFFLINE_PAGE: &str = "/offline.html";

// == Static Manifest ==
/// The fixed list of paths precached at install time.
#[derive(Debug, Clone)]
pub struct StaticManifest {
    paths: Vec<String>,
}

impl StaticManifest {
    /// Creates a manifest from an explicit path list.
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    /// Exact-match membership test against a request path (no query/fragment).
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Iterates over all manifest paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Returns the number of manifest entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for StaticManifest {
    fn default() -> Self {
        Self {
            paths: DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_contains_offline_page() {
        let manifest = StaticManifest::default();
        assert!(manifest.contains(OFFLINE_PAGE));
        assert!(manifest.contains("/"));
        assert!(!manifest.is_empty());
    }

    #[test]
    fn test_contains_is_exact_match() {
        let manifest = StaticManifest::default();
        assert!(manifest.contains("/index.html"));
        assert!(!manifest.contains("/index"));
        assert!(!manifest.contains("/index.html/extra"));
    }

    #[test]
    fn test_custom_manifest() {
        let manifest = StaticManifest::new(vec!["/".to_string(), "/app.js".to_string()]);
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("/app.js"));
        assert!(!manifest.contains("/offline.html"));
    }
}
