use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::CacheError;

const DEFAULT_NAMESPACE: &str = "toolkit";
const DEFAULT_VERSION: &str = "v1.0.0";
const DEFAULT_SCOPE: &str = "http://localhost:8080/";
const DEFAULT_SHELL: &str = "index.html";

/// Transport timeout for the HTTP fetcher.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PRECACHE_URLS: &[&str] = &[
    "index.html",
    "style.css",
    "app.js",
    "js/main.js",
    "js/storage.js",
    "js/participants.js",
    "js/idi.js",
    "js/fgd.js",
    "js/audio.js",
    "js/dashboard.js",
    "js/pwa.js",
    "manifest.json",
    "icons/icon.svg",
    "https://cdnjs.cloudflare.com/ajax/libs/bootstrap/5.3.2/css/bootstrap.min.css",
    "https://cdnjs.cloudflare.com/ajax/libs/bootstrap/5.3.2/js/bootstrap.bundle.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/bootstrap-icons/1.11.1/font/bootstrap-icons.min.css",
];

const DEFAULT_STATIC_HOSTS: &[&str] = &[
    "cdnjs.cloudflare.com",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
];

/// Offline cache configuration for one deployed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineSettings {
    /// Prefix for cache bucket names.
    pub namespace: String,
    /// Build identifier baked into both bucket names.
    pub version: String,
    /// Base URL of the application; relative precache paths resolve against it.
    pub scope: String,
    /// Document served when a navigation cannot reach the network.
    pub shell_document: String,
    pub precache_urls: Vec<String>,
    /// Third-party hosts whose assets get stale-while-revalidate treatment.
    pub static_hosts: Vec<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            version: DEFAULT_VERSION.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            shell_document: DEFAULT_SHELL.to_string(),
            precache_urls: DEFAULT_PRECACHE_URLS.iter().map(|s| s.to_string()).collect(),
            static_hosts: DEFAULT_STATIC_HOSTS.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl OfflineSettings {
    pub fn precache_name(&self) -> String {
        format!("{}-precache-{}", self.namespace, self.version)
    }

    pub fn runtime_name(&self) -> String {
        format!("{}-runtime-{}", self.namespace, self.version)
    }

    pub fn scope_url(&self) -> Result<Url, CacheError> {
        Url::parse(&self.scope).map_err(|e| CacheError::InvalidUrl {
            url: self.scope.clone(),
            reason: e.to_string(),
        })
    }

    /// Resolve a possibly relative URL against the scope.
    pub fn resolve(&self, url: &str) -> Result<Url, CacheError> {
        self.scope_url()?
            .join(url)
            .map_err(|e| CacheError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_static_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.static_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
            .unwrap_or(false)
    }
}
