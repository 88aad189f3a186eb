//! Rolodex Cache — TTL result cache with single-flight de-duplication
//!
//! Shields the backing directory/mailbox service from repeated identical
//! queries. Each operation class carries its own TTL; misses are
//! de-duplicated per key so N concurrent identical requests cost one
//! upstream fan-out.
//!
//! ```text
//! caller ──► get_or_compute(class, key, f)
//!              │ fresh entry?  ──► return cached value
//!              │ flight open?  ──► wait for leader's outcome
//!              └ else          ──► lead: run f, store, publish
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cached, CacheStats, ResultCache};
pub use config::{CacheConfig, TtlClass};
pub use error::CacheError;
