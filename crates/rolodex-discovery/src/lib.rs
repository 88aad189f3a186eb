//! Multi-source person discovery.
//!
//! Finds people by name, address, or domain across three sources — the
//! organizational directory, personal contacts, and message history — and
//! returns one merged, ranked record per person:
//!
//! - [`DirectorySearchAdapter`] runs the fallback strategy chain
//!   (exact, partial, domain, fuzzy) so a query never dead-ends on the
//!   strictest lookup.
//! - [`ContactsCollector`] and [`HistoryCollector`] contribute fragments
//!   from the other two sources.
//! - [`PersonDiscovery`] fans the sources out concurrently, merges fragments
//!   by identity key, ranks with [`RelevanceRanker`], and serves repeated
//!   queries from a shared [`rolodex_cache::ResultCache`].
//!
//! Source failures degrade results instead of failing them; the caller sees
//! which sources were missing in [`DiscoveryMetadata`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clients;
pub mod config;
pub mod contacts;
pub mod directory;
pub mod error;
pub mod history;
mod matching;
pub mod orchestrator;
pub mod ranker;

pub use clients::{
    ClientError, ContactEntry, ContactsClient, DirectoryClient, DirectoryEntry, HistoryClient,
    Mailbox, MessageDirection, MessageSummary,
};
pub use config::DiscoveryConfig;
pub use contacts::ContactsCollector;
pub use directory::{DirectorySearchAdapter, DirectorySearchOutcome};
pub use error::{DiscoveryError, Result};
pub use history::HistoryCollector;
pub use orchestrator::{
    CommunicationHistory, DiscoveryMetadata, DiscoveryRequest, DiscoveryResult, PersonDiscovery,
};
pub use ranker::{RankerWeights, RelevanceRanker};
