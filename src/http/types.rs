//! Request and response wire types.
//!
//! The gateway consults only method, URL and headers of an intercepted
//! request; responses are stored as byte bodies with their headers so they
//! can be replayed verbatim from cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Fetch Request ==
/// An intercepted HTTP request, normalized to owned data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    /// HTTP method, uppercase
    pub method: String,
    /// Path with query string, leading slash
    pub path: String,
    /// Request headers as (name, value) pairs
    pub headers: Vec<(String, String)>,
    /// Request body, empty for GET
    pub body: Vec<u8>,
}

impl FetchRequest {
    /// Creates a GET request for the given path with no headers.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Returns the request identity used as a cache key.
    ///
    /// Identity is the uppercased method plus the path with any fragment
    /// stripped. Query strings are significant; fragments are not sent over
    /// the wire and must not split cache entries.
    pub fn identity(&self) -> String {
        let path = match self.path.split_once('#') {
            Some((before, _)) => before,
            None => self.path.as_str(),
        };
        format!("{} {}", self.method.to_uppercase(), path)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for GET requests; only these are routed through cache strategies.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Returns the path without query string or fragment, for manifest and
    /// prefix matching.
    pub fn path_only(&self) -> &str {
        let path = self.path.split('#').next().unwrap_or(&self.path);
        path.split('?').next().unwrap_or(path)
    }
}

// == Stored Response ==
/// An HTTP response captured for caching and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as (name, value) pairs
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl StoredResponse {
    /// Creates a response with a single Content-Type header.
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    /// True for 2xx statuses; only these are written back to cache buckets.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the `Date` header (RFC 2822), if present and well-formed.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
