use thiserror::Error;

/// Errors surfaced by the cache coordinator.
///
/// Every variant is `Clone` because a single in-flight execution fans its
/// outcome out to all callers that attached to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("gave up waiting for the refresh lease on `{0}`")]
    LockContention(String),

    #[error("producer failed for `{key}`: {message}")]
    Producer { key: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors raised by a backing store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("failed to encode or decode a cache entry: {0}")]
    Codec(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}
