//! Source and strategy tags for discovered person fragments.
//!
//! `PersonSource` is a closed enum (not a string tag) so that merge and
//! priority logic is exhaustively checked by the compiler.

use serde::{Deserialize, Serialize};

/// Where a person fragment was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonSource {
    /// Organization-wide address list (GAL)
    Directory,
    /// The user's personal contacts folder
    PersonalContacts,
    /// Sent/received message traffic
    MessageHistory,
}

impl PersonSource {
    /// All sources, in descending priority order.
    pub const ALL: [PersonSource; 3] = [
        PersonSource::Directory,
        PersonSource::PersonalContacts,
        PersonSource::MessageHistory,
    ];

    /// Merge priority of this source. Higher wins scalar-field conflicts.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Directory => 3,
            Self::PersonalContacts => 2,
            Self::MessageHistory => 1,
        }
    }
}

impl std::fmt::Display for PersonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::PersonalContacts => write!(f, "personal_contacts"),
            Self::MessageHistory => write!(f, "message_history"),
        }
    }
}

/// Directory search strategy that produced a fragment.
///
/// Carried for diagnostics only; the ranker never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Verbatim lookup of the query string
    Exact,
    /// Prefix/substring lookup
    Partial,
    /// All entries under the query's mail domain
    Domain,
    /// Approximate name/address matching
    Fuzzy,
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Partial => write!(f, "partial"),
            Self::Domain => write!(f, "domain"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}
