//! Error types for cache operations.
//!
//! Only caller faults surface as errors. Internal faults (a corrupt stored
//! entry, a failed sweep pass) are logged and absorbed by the cache.

use thiserror::Error;

/// Errors returned by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The value could not be encoded with the configured codec.
    #[error("failed to serialize value: {0}")]
    Serialization(String),

    /// A stored representation could not be decoded into the requested type.
    #[error("failed to deserialize entry: {0}")]
    Deserialization(String),

    /// A zero TTL would produce an entry that is expired on creation.
    #[error("ttl for key '{key}' must be greater than zero")]
    InvalidTtl { key: String },

    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// The background sweeper needs a tokio runtime to run on.
    #[error("no tokio runtime available: {0}")]
    Runtime(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
