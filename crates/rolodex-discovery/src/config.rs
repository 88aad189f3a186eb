//! Discovery pipeline configuration.
//!
//! Loaded from TOML by the embedding application; every field has a default
//! so an empty document is a valid config.

use crate::ranker::RankerWeights;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the discovery orchestrator and its source adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Hard cap on records returned by a single discovery call
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-collaborator-call time budget, seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Overall per-request fan-out budget, seconds. Branches still pending
    /// at the deadline are cancelled and reported as degraded sources.
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,

    /// Days of message history scanned for communication stats
    #[serde(default = "default_history_window_days")]
    pub history_window_days: u32,

    /// Minimum Jaro-Winkler similarity for the fuzzy fallback step
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Ranking weights
    #[serde(default)]
    pub ranker: RankerWeights,
}

fn default_max_results() -> usize {
    50
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_request_deadline_secs() -> u64 {
    30
}

fn default_history_window_days() -> u32 {
    180
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            call_timeout_secs: default_call_timeout_secs(),
            request_deadline_secs: default_request_deadline_secs(),
            history_window_days: default_history_window_days(),
            fuzzy_threshold: default_fuzzy_threshold(),
            ranker: RankerWeights::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Parse a TOML document; missing fields take defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Per-call time budget as a [`Duration`].
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Per-request fan-out budget as a [`Duration`].
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_valid() {
        let config = DiscoveryConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_results, 50);
        assert_eq!(config.request_deadline(), Duration::from_secs(30));
        assert_eq!(config.history_window_days, 180);
        assert!((config.fuzzy_threshold - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_override() {
        let config = DiscoveryConfig::from_toml_str(
            r#"
            max_results = 10
            call_timeout_secs = 3

            [ranker]
            vip_bonus = 40.0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_results, 10);
        assert_eq!(config.call_timeout(), Duration::from_secs(3));
        assert!((config.ranker.vip_bonus - 40.0).abs() < f64::EPSILON);
        // Untouched ranker fields keep their defaults.
        assert!((config.ranker.exact_match - 100.0).abs() < f64::EPSILON);
    }
}
