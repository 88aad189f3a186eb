//! The canonical merged representation of a discovered person.
//!
//! Source adapters produce `PersonRecord` fragments; the orchestrator merges
//! fragments that share an identity key into one record. Merge rules:
//! scalar fields yield only to a strictly higher-priority source, set-valued
//! fields are unioned, VIP is OR'ed, and the relationship strength is
//! recomputed from the merged inputs.

use crate::source::{PersonSource, SearchStrategy};
use crate::stats::CommunicationStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Classification of a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneKind {
    /// Office / work line
    Business,
    /// Mobile number
    Mobile,
    /// Anything else (home, fax, …)
    Other,
}

impl PhoneKind {
    /// Map a free-form label from a backing service onto a kind.
    #[must_use]
    pub fn from_label_lossy(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "business" | "work" | "office" => Self::Business,
            "mobile" | "cell" => Self::Mobile,
            _ => Self::Other,
        }
    }
}

/// A phone number with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// The number as the backing service reported it
    pub number: String,
    /// Business / mobile / other
    pub kind: PhoneKind,
}

/// Derive the stable dedup key for a person fragment.
///
/// The key is the normalized (lower-cased, trimmed) primary email when one is
/// known. Without an email it falls back to a composite of the normalized
/// display name and the inferred organizational domain, so fragments from
/// email-less sources still collide with themselves across queries.
#[must_use]
pub fn derive_identity_key(
    display_name: &str,
    primary_email: Option<&str>,
    org_domain: Option<&str>,
) -> String {
    if let Some(email) = primary_email {
        let email = email.trim().to_lowercase();
        if !email.is_empty() {
            return email;
        }
    }
    let name = normalize_name(display_name);
    let domain = org_domain
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{name}|{domain}")
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A person assembled from one or more sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Stable dedup key; never empty. See [`derive_identity_key`].
    pub identity_key: String,
    /// Full display name; higher-priority sources may overwrite it
    pub display_name: String,
    /// Email addresses in discovery order, deduplicated case-insensitively.
    /// The first entry is the primary address.
    pub email_addresses: Vec<String>,
    /// Known phone numbers, deduplicated by number
    pub phone_numbers: Vec<PhoneNumber>,
    /// Company / organization
    pub organization: Option<String>,
    /// Department within the organization
    pub department: Option<String>,
    /// Job title
    pub job_title: Option<String>,
    /// Office location
    pub office_location: Option<String>,
    /// Aggregated message traffic with this person
    pub stats: CommunicationStats,
    /// Every source that contributed to this record
    pub sources: BTreeSet<PersonSource>,
    /// True if any contributing source flags this person as a VIP
    pub is_vip: bool,
    /// Directory strategy that found this fragment (diagnostics only)
    pub matched_strategy: Option<SearchStrategy>,
    /// Derived score in [0, 1]; recomputed after every merge
    pub relationship_strength: f64,
}

impl PersonRecord {
    /// Create a fragment with a derived identity key.
    #[must_use]
    pub fn new(
        display_name: impl Into<String>,
        primary_email: Option<&str>,
        source: PersonSource,
    ) -> Self {
        let display_name = display_name.into();
        let identity_key = derive_identity_key(&display_name, primary_email, None);
        let mut record = Self {
            identity_key,
            display_name,
            email_addresses: Vec::new(),
            phone_numbers: Vec::new(),
            organization: None,
            department: None,
            job_title: None,
            office_location: None,
            stats: CommunicationStats::new(),
            sources: BTreeSet::from([source]),
            is_vip: false,
            matched_strategy: None,
            relationship_strength: 0.0,
        };
        if let Some(email) = primary_email {
            record.add_email(email);
        }
        record
    }

    /// The first known email address, if any.
    ///
    /// Non-`None` whenever `email_addresses` is non-empty.
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(String::as_str)
    }

    /// Append an email address, suppressing case-insensitive duplicates.
    pub fn add_email(&mut self, address: &str) {
        let address = address.trim();
        if address.is_empty() {
            return;
        }
        let lowered = address.to_lowercase();
        if !self
            .email_addresses
            .iter()
            .any(|e| e.to_lowercase() == lowered)
        {
            self.email_addresses.push(address.to_string());
        }
    }

    /// Append a phone number, deduplicating by number.
    pub fn add_phone(&mut self, phone: PhoneNumber) {
        if !self.phone_numbers.iter().any(|p| p.number == phone.number) {
            self.phone_numbers.push(phone);
        }
    }

    /// Highest priority among contributing sources.
    #[must_use]
    pub fn best_priority(&self) -> u8 {
        self.sources
            .iter()
            .map(|s| s.priority())
            .max()
            .unwrap_or(0)
    }

    /// Number of populated optional profile fields (used by ranking).
    #[must_use]
    pub fn completeness(&self) -> usize {
        let mut n = 0;
        if self.organization.is_some() {
            n += 1;
        }
        if self.department.is_some() {
            n += 1;
        }
        if self.job_title.is_some() {
            n += 1;
        }
        if self.office_location.is_some() {
            n += 1;
        }
        if !self.phone_numbers.is_empty() {
            n += 1;
        }
        n
    }

    /// Merge another fragment for the same identity into this record.
    ///
    /// Scalar fields are overwritten only when `other` carries a strictly
    /// higher source priority (empty scalars are filled from either side).
    /// Multi-valued fields, sources, and stats are unioned; VIP is OR'ed.
    /// `relationship_strength` is recomputed against `now`.
    pub fn merge(&mut self, other: &PersonRecord, now: DateTime<Utc>) {
        debug_assert_eq!(self.identity_key, other.identity_key);

        let other_wins = other.best_priority() > self.best_priority();

        if !other.display_name.is_empty() && (other_wins || self.display_name.is_empty()) {
            self.display_name = other.display_name.clone();
        }
        merge_scalar(&mut self.organization, &other.organization, other_wins);
        merge_scalar(&mut self.department, &other.department, other_wins);
        merge_scalar(&mut self.job_title, &other.job_title, other_wins);
        merge_scalar(&mut self.office_location, &other.office_location, other_wins);

        for email in &other.email_addresses {
            self.add_email(email);
        }
        for phone in &other.phone_numbers {
            self.add_phone(phone.clone());
        }
        self.sources.extend(other.sources.iter().copied());
        self.stats.merge_from(&other.stats);
        self.is_vip = self.is_vip || other.is_vip;
        if self.matched_strategy.is_none() {
            self.matched_strategy = other.matched_strategy;
        }

        self.recompute_strength(now);
    }

    /// Recompute `relationship_strength` from the current stats and VIP flag.
    ///
    /// Volume and recency each contribute up to 0.4, VIP a flat 0.2; the
    /// result is clamped to [0, 1].
    pub fn recompute_strength(&mut self, now: DateTime<Utc>) {
        let mut score = 0.0_f64;

        let volume = (self.stats.total() as f64 / 100.0).min(1.0);
        score += 0.4 * volume;

        if let Some(last) = self.stats.last_contact {
            let days = (now - last).num_days().max(0) as f64;
            score += 0.4 * (1.0 - days / 365.0).max(0.0);
        }

        if self.is_vip {
            score += 0.2;
        }

        self.relationship_strength = score.clamp(0.0, 1.0);
    }
}

fn merge_scalar(mine: &mut Option<String>, theirs: &Option<String>, other_wins: bool) {
    if theirs.is_some() && (other_wins || mine.is_none()) {
        mine.clone_from(theirs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_identity_key_prefers_email() {
        let key = derive_identity_key("Ahmed Al-Rashid", Some("  Ahmed@Co.COM "), None);
        assert_eq!(key, "ahmed@co.com");
    }

    #[test]
    fn test_identity_key_composite_fallback() {
        let key = derive_identity_key("  Ahmed   Al-Rashid ", None, Some("Co.com"));
        assert_eq!(key, "ahmed al-rashid|co.com");
        let no_domain = derive_identity_key("Ahmed Al-Rashid", None, None);
        assert_eq!(no_domain, "ahmed al-rashid|unknown");
    }

    #[test]
    fn test_identity_key_never_empty() {
        assert!(!derive_identity_key("", None, None).is_empty());
        assert!(!derive_identity_key("", Some(""), None).is_empty());
    }

    #[test]
    fn test_email_dedup_case_insensitive() {
        let mut record = PersonRecord::new("A", Some("a@co.com"), PersonSource::Directory);
        record.add_email("A@CO.COM");
        record.add_email("alias@co.com");
        assert_eq!(record.email_addresses, vec!["a@co.com", "alias@co.com"]);
        assert_eq!(record.primary_email(), Some("a@co.com"));
    }

    fn directory_fragment() -> PersonRecord {
        let mut r = PersonRecord::new("Ahmed Al-Rashid", Some("ahmed@co.com"), PersonSource::Directory);
        r.job_title = Some("Engineer".into());
        r.organization = Some("Co".into());
        r
    }

    fn history_fragment() -> PersonRecord {
        let mut r = PersonRecord::new("ahmed", Some("ahmed@co.com"), PersonSource::MessageHistory);
        r.organization = Some("Co Ltd".into());
        r.department = Some("Platform".into());
        r.stats.record_received("m1", now());
        r
    }

    #[test]
    fn test_merge_scalar_priority() {
        // Higher-priority receiver keeps its scalars; lower-priority fragment
        // only fills gaps.
        let mut merged = directory_fragment();
        merged.merge(&history_fragment(), now());
        assert_eq!(merged.display_name, "Ahmed Al-Rashid");
        assert_eq!(merged.organization.as_deref(), Some("Co"));
        assert_eq!(merged.department.as_deref(), Some("Platform"));

        // Reversed: the directory fragment is strictly higher priority and
        // overwrites the history scalars.
        let mut merged = history_fragment();
        merged.merge(&directory_fragment(), now());
        assert_eq!(merged.display_name, "Ahmed Al-Rashid");
        assert_eq!(merged.organization.as_deref(), Some("Co"));
    }

    #[test]
    fn test_merge_set_fields_commutative() {
        let mut ab = directory_fragment();
        ab.merge(&history_fragment(), now());
        let mut ba = history_fragment();
        ba.merge(&directory_fragment(), now());

        let emails_ab: BTreeSet<String> =
            ab.email_addresses.iter().map(|e| e.to_lowercase()).collect();
        let emails_ba: BTreeSet<String> =
            ba.email_addresses.iter().map(|e| e.to_lowercase()).collect();
        assert_eq!(emails_ab, emails_ba);
        assert_eq!(ab.sources, ba.sources);
        assert_eq!(ab.stats, ba.stats);
        assert_eq!(ab.is_vip, ba.is_vip);
    }

    #[test]
    fn test_merge_idempotent() {
        let b = history_fragment();
        let mut ab = directory_fragment();
        ab.merge(&b, now());
        let mut abb = ab.clone();
        abb.merge(&b, now());
        assert_eq!(abb, ab);
    }

    #[test]
    fn test_merge_vip_or() {
        let mut a = directory_fragment();
        let mut b = history_fragment();
        b.is_vip = true;
        a.merge(&b, now());
        assert!(a.is_vip);
    }

    #[test]
    fn test_strength_recency_and_vip() {
        let mut r = PersonRecord::new("A", Some("a@co.com"), PersonSource::MessageHistory);
        r.recompute_strength(now());
        assert_eq!(r.relationship_strength, 0.0);

        r.stats.record_received("m1", now());
        r.is_vip = true;
        r.recompute_strength(now());
        // volume 0.4 * 0.01 + recency 0.4 + vip 0.2
        assert!(r.relationship_strength > 0.6);
        assert!(r.relationship_strength <= 1.0);
    }

    #[test]
    fn test_phone_kind_labels() {
        assert_eq!(PhoneKind::from_label_lossy("Work"), PhoneKind::Business);
        assert_eq!(PhoneKind::from_label_lossy("cell"), PhoneKind::Mobile);
        assert_eq!(PhoneKind::from_label_lossy("fax"), PhoneKind::Other);
    }
}
