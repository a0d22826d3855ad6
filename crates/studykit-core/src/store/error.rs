use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("I/O error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize dataset: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the backend refused the write (full, disabled, unreachable),
    /// as opposed to the value itself being unserializable.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, StoreError::Serialize(_))
    }
}
