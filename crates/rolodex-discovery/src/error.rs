//! Error types for the discovery pipeline.
//!
//! Per-source failures are absorbed by the orchestrator and reported through
//! result metadata; only invalid input, total failure, or a broken cache
//! flight reach the caller as errors.

/// Errors surfaced by discovery operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The query was empty after trimming
    #[error("query must be non-empty")]
    InvalidQuery,

    /// Every enabled source failed; distinct from a legitimate empty result
    #[error("all enabled sources failed: {0}")]
    AllSourcesFailed(String),

    /// A shared cache computation failed or was abandoned
    #[error("cached result unavailable: {0}")]
    CacheCompute(String),

    /// The caller cancelled the request
    #[error("discovery cancelled")]
    Cancelled,
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
