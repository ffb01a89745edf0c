//! Cache Errors
//!
//! One error type crosses every tier. `NotFound` is kept apart from the rest so
//! callers can fall through to the next tier (or the loader) on a plain miss
//! while still surfacing transport and codec failures.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Errors produced by any cache tier
///
/// The type is `Clone` because a single deduplicated load hands the same
/// outcome to every waiting caller. Foreign errors are therefore kept behind
/// an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Key is absent from the queried tier
    #[error("key not found")]
    NotFound,

    /// Remote store transport failure
    #[error("remote store error: {0:#}")]
    Remote(Arc<anyhow::Error>),

    /// Value could not be encoded or decoded
    #[error("codec error: {0:#}")]
    Codec(Arc<anyhow::Error>),

    /// Remote call did not finish within the configured bound
    #[error("remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// Loader failed; shared verbatim with every waiter of the same key
    #[error("loader failed: {0:#}")]
    Loader(Arc<anyhow::Error>),

    /// Cache could not be constructed
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Wrap a remote backend failure
    pub fn remote(err: impl Into<anyhow::Error>) -> Self {
        Self::Remote(Arc::new(err.into()))
    }

    /// Wrap a serialization failure
    pub fn codec(err: impl Into<anyhow::Error>) -> Self {
        Self::Codec(Arc::new(err.into()))
    }

    /// Wrap a loader failure
    pub fn loader(err: impl Into<anyhow::Error>) -> Self {
        Self::Loader(Arc::new(err.into()))
    }

    /// Whether this is a plain miss rather than a failure
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
