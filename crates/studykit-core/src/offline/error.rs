use thiserror::Error;

use super::manager::LifecycleState;

/// Transport-level failure: the request produced no response at all.
///
/// HTTP error statuses are not failures here; they come back as responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to precache {url}: {source}")]
    Precache {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to precache {url}: HTTP {status}")]
    PrecacheStatus { url: String, status: u16 },

    #[error("Network request for {url} failed with nothing cached: {source}")]
    Network {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },

    #[error("Invalid cache bucket name: {0}")]
    InvalidBucket(String),

    #[error("Cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache storage data error: {0}")]
    Data(#[from] serde_json::Error),
}

impl CacheError {
    /// Whether the caller should see this as a network error.
    pub fn is_network(&self) -> bool {
        matches!(self, CacheError::Network { .. })
    }
}
