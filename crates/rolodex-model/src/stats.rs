//! Communication statistics between the mailbox owner and a person.
//!
//! Counts are derived from per-direction message-ID sets rather than stored
//! as integers. Merging two stats is a set union, so the same message counted
//! by two sources contributes exactly once — no double counting, and merge is
//! commutative and idempotent by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Message traffic statistics with one correspondent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationStats {
    /// IDs of messages the owner sent to this person
    sent: BTreeSet<String>,
    /// IDs of messages the owner received from this person
    received: BTreeSet<String>,
    /// Earliest observed contact
    pub first_contact: Option<DateTime<Utc>>,
    /// Most recent observed contact
    pub last_contact: Option<DateTime<Utc>>,
}

impl CommunicationStats {
    /// Empty stats (no observed traffic).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outgoing message to this person.
    pub fn record_sent(&mut self, message_id: impl Into<String>, at: DateTime<Utc>) {
        self.sent.insert(message_id.into());
        self.observe(at);
    }

    /// Record an incoming message from this person.
    pub fn record_received(&mut self, message_id: impl Into<String>, at: DateTime<Utc>) {
        self.received.insert(message_id.into());
        self.observe(at);
    }

    /// Number of messages sent to this person.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// Number of messages received from this person.
    #[must_use]
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Total messages exchanged.
    #[must_use]
    pub fn total(&self) -> usize {
        self.sent.len() + self.received.len()
    }

    /// Whether any traffic has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.received.is_empty() && self.first_contact.is_none()
    }

    /// Merge another stats fragment into this one.
    ///
    /// Message-ID sets are unioned; contact bounds widen to the earliest
    /// first and latest last.
    pub fn merge_from(&mut self, other: &CommunicationStats) {
        self.sent.extend(other.sent.iter().cloned());
        self.received.extend(other.received.iter().cloned());
        self.first_contact = match (self.first_contact, other.first_contact) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_contact = match (self.last_contact, other.last_contact) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    fn observe(&mut self, at: DateTime<Utc>) {
        self.first_contact = Some(self.first_contact.map_or(at, |t| t.min(at)));
        self.last_contact = Some(self.last_contact.map_or(at, |t| t.max(at)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_counts_and_bounds() {
        let mut stats = CommunicationStats::new();
        stats.record_received("m1", ts(3));
        stats.record_received("m2", ts(7));
        stats.record_sent("m3", ts(5));

        assert_eq!(stats.received_count(), 2);
        assert_eq!(stats.sent_count(), 1);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.first_contact, Some(ts(3)));
        assert_eq!(stats.last_contact, Some(ts(7)));
    }

    #[test]
    fn test_no_double_counting_across_merge() {
        let mut a = CommunicationStats::new();
        a.record_received("m1", ts(1));
        a.record_received("m2", ts(2));

        // Second source saw m2 as well, plus one new message.
        let mut b = CommunicationStats::new();
        b.record_received("m2", ts(2));
        b.record_sent("m9", ts(9));

        a.merge_from(&b);
        assert_eq!(a.received_count(), 2);
        assert_eq!(a.sent_count(), 1);
        assert_eq!(a.total(), 3);
        assert_eq!(a.last_contact, Some(ts(9)));
    }

    #[test]
    fn test_merge_commutative_and_idempotent() {
        let mut a = CommunicationStats::new();
        a.record_sent("s1", ts(4));
        let mut b = CommunicationStats::new();
        b.record_received("r1", ts(8));

        let mut ab = a.clone();
        ab.merge_from(&b);
        let mut ba = b.clone();
        ba.merge_from(&a);
        assert_eq!(ab, ba);

        let mut abb = ab.clone();
        abb.merge_from(&b);
        assert_eq!(abb, ab);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut stats = CommunicationStats::new();
        stats.record_sent("s1", ts(1));
        let json = serde_json::to_string(&stats).unwrap();
        let back: CommunicationStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
