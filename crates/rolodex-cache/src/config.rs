//! Cache configuration: per-operation-class TTLs and capacity bounds.
//!
//! The durations are policy, not contracts — deployments tune them via the
//! embedding application's TOML config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operation class a cached value belongs to. Each class has its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Directory search results — the directory changes rarely
    DirectorySearch,
    /// Single-person detail lookups
    PersonDetail,
    /// Personal contacts listings
    Contacts,
    /// Folder / listing metadata
    FolderListing,
    /// Content and message searches — freshest class
    ContentSearch,
}

impl std::fmt::Display for TtlClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectorySearch => write!(f, "directory_search"),
            Self::PersonDetail => write!(f, "person_detail"),
            Self::Contacts => write!(f, "contacts"),
            Self::FolderListing => write!(f, "folder_listing"),
            Self::ContentSearch => write!(f, "content_search"),
        }
    }
}

/// Tunable cache parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for directory search results (seconds)
    #[serde(default = "default_directory_search_ttl")]
    pub directory_search_ttl_secs: u64,
    /// TTL for person detail lookups (seconds)
    #[serde(default = "default_person_detail_ttl")]
    pub person_detail_ttl_secs: u64,
    /// TTL for contacts listings (seconds)
    #[serde(default = "default_contacts_ttl")]
    pub contacts_ttl_secs: u64,
    /// TTL for folder/listing metadata (seconds)
    #[serde(default = "default_folder_listing_ttl")]
    pub folder_listing_ttl_secs: u64,
    /// TTL for content/message searches (seconds)
    #[serde(default = "default_content_search_ttl")]
    pub content_search_ttl_secs: u64,
    /// Maximum number of cached entries before LRU eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Interval between periodic expiry sweeps (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_directory_search_ttl() -> u64 {
    3600
}

fn default_person_detail_ttl() -> u64 {
    1800
}

fn default_contacts_ttl() -> u64 {
    1800
}

fn default_folder_listing_ttl() -> u64 {
    300
}

fn default_content_search_ttl() -> u64 {
    60
}

fn default_max_entries() -> usize {
    1024
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory_search_ttl_secs: default_directory_search_ttl(),
            person_detail_ttl_secs: default_person_detail_ttl(),
            contacts_ttl_secs: default_contacts_ttl(),
            folder_listing_ttl_secs: default_folder_listing_ttl(),
            content_search_ttl_secs: default_content_search_ttl(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    /// TTL for the given operation class.
    #[must_use]
    pub fn ttl(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::DirectorySearch => self.directory_search_ttl_secs,
            TtlClass::PersonDetail => self.person_detail_ttl_secs,
            TtlClass::Contacts => self.contacts_ttl_secs,
            TtlClass::FolderListing => self.folder_listing_ttl_secs,
            TtlClass::ContentSearch => self.content_search_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Interval between periodic sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_durations() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.ttl(TtlClass::DirectorySearch), Duration::from_secs(3600));
        assert_eq!(cfg.ttl(TtlClass::PersonDetail), Duration::from_secs(1800));
        assert_eq!(cfg.ttl(TtlClass::Contacts), Duration::from_secs(1800));
        assert_eq!(cfg.ttl(TtlClass::FolderListing), Duration::from_secs(300));
        assert_eq!(cfg.ttl(TtlClass::ContentSearch), Duration::from_secs(60));
    }

    #[test]
    fn test_class_display_is_stable() {
        // These strings are cache-key components; renaming them would orphan
        // previously keyed entries within a process lifetime.
        assert_eq!(TtlClass::DirectorySearch.to_string(), "directory_search");
        assert_eq!(TtlClass::ContentSearch.to_string(), "content_search");
    }
}
