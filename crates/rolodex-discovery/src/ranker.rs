//! Deterministic relevance ranking of merged person records.
//!
//! Score = source priority + string-match quality + communication volume
//! (logarithmic) + recency (exponential decay) + VIP bonus + profile
//! completeness. Scoring is a pure function of (record, query, now), so
//! identical inputs always produce identical order.

use crate::matching::{self, MatchQuality};
use chrono::{DateTime, Utc};
use rolodex_model::{PersonRecord, PersonSource};
use serde::{Deserialize, Serialize};

/// Tunable ranking weights.
///
/// Only the relative ordering of the match tiers is a hard contract
/// (exact > prefix > substring > any fuzzy score); the numeric values are
/// policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerWeights {
    /// Weight for records seen in the directory
    #[serde(default = "default_source_directory")]
    pub source_directory: f64,
    /// Weight for records seen in personal contacts
    #[serde(default = "default_source_contacts")]
    pub source_contacts: f64,
    /// Weight for records seen in message history
    #[serde(default = "default_source_history")]
    pub source_history: f64,
    /// Exact query match of a name or address
    #[serde(default = "default_exact_match")]
    pub exact_match: f64,
    /// Query is a prefix of a name or address
    #[serde(default = "default_prefix_match")]
    pub prefix_match: f64,
    /// Query occurs inside a name or address
    #[serde(default = "default_substring_match")]
    pub substring_match: f64,
    /// Ceiling for the fuzzy tier; kept below `substring_match` so the
    /// tiers stay strictly ordered
    #[serde(default = "default_fuzzy_match_max")]
    pub fuzzy_match_max: f64,
    /// Multiplier on `ln(1 + total_messages)`
    #[serde(default = "default_volume_weight")]
    pub volume_weight: f64,
    /// Maximum recency contribution (at last contact = now)
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
    /// Days for the recency contribution to halve
    #[serde(default = "default_recency_half_life_days")]
    pub recency_half_life_days: f64,
    /// Flat bonus for VIP-flagged records
    #[serde(default = "default_vip_bonus")]
    pub vip_bonus: f64,
    /// Bonus per populated optional profile field
    #[serde(default = "default_completeness_per_field")]
    pub completeness_per_field: f64,
}

fn default_source_directory() -> f64 {
    100.0
}

fn default_source_contacts() -> f64 {
    80.0
}

fn default_source_history() -> f64 {
    60.0
}

fn default_exact_match() -> f64 {
    100.0
}

fn default_prefix_match() -> f64 {
    75.0
}

fn default_substring_match() -> f64 {
    50.0
}

fn default_fuzzy_match_max() -> f64 {
    40.0
}

fn default_volume_weight() -> f64 {
    10.0
}

fn default_recency_weight() -> f64 {
    30.0
}

fn default_recency_half_life_days() -> f64 {
    21.0
}

fn default_vip_bonus() -> f64 {
    20.0
}

fn default_completeness_per_field() -> f64 {
    5.0
}

impl Default for RankerWeights {
    fn default() -> Self {
        Self {
            source_directory: default_source_directory(),
            source_contacts: default_source_contacts(),
            source_history: default_source_history(),
            exact_match: default_exact_match(),
            prefix_match: default_prefix_match(),
            substring_match: default_substring_match(),
            fuzzy_match_max: default_fuzzy_match_max(),
            volume_weight: default_volume_weight(),
            recency_weight: default_recency_weight(),
            recency_half_life_days: default_recency_half_life_days(),
            vip_bonus: default_vip_bonus(),
            completeness_per_field: default_completeness_per_field(),
        }
    }
}

/// Orders merged person records for a query.
#[derive(Debug, Clone, Default)]
pub struct RelevanceRanker {
    weights: RankerWeights,
}

impl RelevanceRanker {
    /// Create a ranker with the given weights.
    #[must_use]
    pub fn new(weights: RankerWeights) -> Self {
        Self { weights }
    }

    /// Score one record against a query. Pure: no hidden state, no clock
    /// reads — `now` is an input.
    #[must_use]
    pub fn score(&self, record: &PersonRecord, query: &str, now: DateTime<Utc>) -> f64 {
        let w = &self.weights;
        let mut score = 0.0_f64;

        // Source priority: best contributing source wins.
        score += record
            .sources
            .iter()
            .map(|s| match s {
                PersonSource::Directory => w.source_directory,
                PersonSource::PersonalContacts => w.source_contacts,
                PersonSource::MessageHistory => w.source_history,
            })
            .fold(0.0, f64::max);

        // String-match quality, strictly tiered.
        score += match matching::match_quality(query, &record.display_name, &record.email_addresses)
        {
            MatchQuality::Exact => w.exact_match,
            MatchQuality::Prefix => w.prefix_match,
            MatchQuality::Substring => w.substring_match,
            MatchQuality::Fuzzy(sim) => w.fuzzy_match_max * sim.clamp(0.0, 1.0),
        };

        // Communication volume with diminishing returns.
        let total = record.stats.total();
        if total > 0 {
            score += w.volume_weight * (1.0 + total as f64).ln();
        }

        // Recency: exponential decay from the last contact.
        if let Some(last) = record.stats.last_contact {
            let days = (now - last).num_days().max(0) as f64;
            score += w.recency_weight * 0.5_f64.powf(days / w.recency_half_life_days);
        }

        if record.is_vip {
            score += w.vip_bonus;
        }

        score += w.completeness_per_field * record.completeness() as f64;

        score
    }

    /// Produce a total order: score descending, ties broken by original
    /// discovery order, then case-insensitive display name.
    #[must_use]
    pub fn rank(
        &self,
        records: Vec<PersonRecord>,
        query: &str,
        now: DateTime<Utc>,
    ) -> Vec<PersonRecord> {
        let mut scored: Vec<(f64, usize, PersonRecord)> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| (self.score(&record, query, now), index, record))
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| {
                    a.2.display_name
                        .to_lowercase()
                        .cmp(&b.2.display_name.to_lowercase())
                })
        });

        scored.into_iter().map(|(_, _, record)| record).collect()
    }
}
