//! Error types for cache operations.

/// Errors surfaced by [`ResultCache::get_or_compute`](crate::ResultCache::get_or_compute).
///
/// `E` is the caller's compute error type: the single-flight leader gets its
/// own error back typed, while concurrent waiters receive the stringified
/// form (domain errors are not `Clone`).
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E> {
    /// The compute function failed (returned to the leader only)
    #[error(transparent)]
    Compute(E),

    /// The single-flight leader for this key failed; this caller was a waiter
    #[error("concurrent compute for this key failed: {0}")]
    Shared(String),

    /// The leader was dropped (cancelled) before publishing a result
    #[error("compute abandoned before publishing a result")]
    LeaderVanished,

    /// Cached value could not be (de)serialized
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
