//! Rolodex Model — canonical person records
//!
//! In-memory representation of a discovered person, assembled from directory,
//! contacts, and message-history fragments. Fragments sharing an identity key
//! merge into one record; merging unions set-valued fields, lets strictly
//! higher-priority sources win scalar conflicts, and recomputes the derived
//! relationship strength.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod record;
pub mod source;
pub mod stats;

pub use record::{derive_identity_key, PersonRecord, PhoneKind, PhoneNumber};
pub use source::{PersonSource, SearchStrategy};
pub use stats::CommunicationStats;
