//! Message-history source.
//!
//! Scans recent mailbox traffic and aggregates it per correspondent:
//! outgoing messages count as sent-to each recipient, incoming messages as
//! received-from the sender. Message IDs are carried into the stats so a
//! message seen twice (or via two scan windows) is never double-counted.

use crate::clients::{ClientError, HistoryClient, MessageDirection, MessageSummary};
use rolodex_model::{CommunicationStats, PersonRecord, PersonSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct Correspondent {
    display_name: String,
    stats: CommunicationStats,
}

/// Aggregates mailbox traffic into per-correspondent fragments.
pub struct HistoryCollector {
    client: Arc<dyn HistoryClient>,
    window_days: u32,
    call_timeout: Duration,
}

impl HistoryCollector {
    /// Create a collector over the given client.
    #[must_use]
    pub fn new(client: Arc<dyn HistoryClient>, window_days: u32, call_timeout: Duration) -> Self {
        Self {
            client,
            window_days,
            call_timeout,
        }
    }

    /// Correspondents matching `query` within the default window.
    ///
    /// A query of the form `"@domain"` matches every correspondent in that
    /// domain; any other query is a case-insensitive substring match on
    /// address and display name.
    pub async fn collect(&self, query: &str) -> Result<Vec<PersonRecord>, ClientError> {
        self.collect_window(query, self.window_days).await
    }

    /// Same as [`collect`](Self::collect) with an explicit window.
    pub async fn collect_window(
        &self,
        query: &str,
        window_days: u32,
    ) -> Result<Vec<PersonRecord>, ClientError> {
        let messages = tokio::time::timeout(
            self.call_timeout,
            self.client.scan_messages(window_days),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        let correspondents = aggregate(messages);
        debug!(
            window_days,
            correspondents = correspondents.len(),
            "history aggregation complete"
        );

        Ok(correspondents
            .into_iter()
            .filter(|(address, correspondent)| {
                matches_query(query, address, &correspondent.display_name)
            })
            .map(|(address, correspondent)| {
                let mut record = PersonRecord::new(
                    &correspondent.display_name,
                    Some(&address),
                    PersonSource::MessageHistory,
                );
                record.stats = correspondent.stats;
                record
            })
            .collect())
    }
}

/// Fold messages into per-address stats. Keyed by lowercased address so the
/// output order is stable.
fn aggregate(messages: Vec<MessageSummary>) -> BTreeMap<String, Correspondent> {
    let mut by_address: BTreeMap<String, Correspondent> = BTreeMap::new();

    for message in &messages {
        match message.direction {
            MessageDirection::Outgoing => {
                for recipient in &message.recipients {
                    touch(&mut by_address, &recipient.address, &recipient.name, message);
                }
            }
            MessageDirection::Incoming => {
                touch(
                    &mut by_address,
                    &message.sender.address,
                    &message.sender.name,
                    message,
                );
            }
        }
    }

    by_address
}

fn touch(
    by_address: &mut BTreeMap<String, Correspondent>,
    address: &str,
    name: &str,
    message: &MessageSummary,
) {
    let key = address.trim().to_lowercase();
    if key.is_empty() {
        return;
    }
    let entry = by_address
        .entry(key.clone())
        .or_insert_with(|| Correspondent {
            display_name: if name.is_empty() {
                key.clone()
            } else {
                name.to_string()
            },
            stats: CommunicationStats::default(),
        });
    // Upgrade a bare-address display name once a real one shows up.
    if entry.display_name == key && !name.is_empty() {
        entry.display_name = name.to_string();
    }
    match message.direction {
        MessageDirection::Outgoing => entry
            .stats
            .record_sent(message.message_id.clone(), message.timestamp),
        MessageDirection::Incoming => entry
            .stats
            .record_received(message.message_id.clone(), message.timestamp),
    }
}

fn matches_query(query: &str, address: &str, display_name: &str) -> bool {
    let q = query.trim().to_lowercase();
    if let Some(domain) = q.strip_prefix('@') {
        return address.ends_with(&format!("@{domain}"));
    }
    address.contains(&q) || display_name.to_lowercase().contains(&q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{Mailbox, MockHistoryClient};
    use chrono::{TimeZone, Utc};

    fn mailbox(name: &str, address: &str) -> Mailbox {
        Mailbox {
            address: address.to_string(),
            name: name.to_string(),
        }
    }

    fn message(
        id: &str,
        direction: MessageDirection,
        sender: Mailbox,
        recipients: Vec<Mailbox>,
        day: u32,
    ) -> MessageSummary {
        MessageSummary {
            message_id: id.to_string(),
            direction,
            sender,
            recipients,
            timestamp: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
        }
    }

    fn collector(messages: Vec<MessageSummary>) -> HistoryCollector {
        let mut client = MockHistoryClient::new();
        client
            .expect_scan_messages()
            .returning(move |_| Ok(messages.clone()));
        HistoryCollector::new(Arc::new(client), 180, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_aggregates_per_correspondent_by_direction() {
        let me = mailbox("Me", "me@co.com");
        let ana = mailbox("Ana Silva", "ana@partner.com");
        let collector = collector(vec![
            message("m1", MessageDirection::Incoming, ana.clone(), vec![me.clone()], 1),
            message("m2", MessageDirection::Incoming, ana.clone(), vec![me.clone()], 3),
            message("m3", MessageDirection::Outgoing, me.clone(), vec![ana.clone()], 5),
        ]);

        let fragments = collector.collect("ana").await.unwrap();
        assert_eq!(fragments.len(), 1);
        let record = &fragments[0];
        assert_eq!(record.stats.received_count(), 2);
        assert_eq!(record.stats.sent_count(), 1);
        assert_eq!(
            record.stats.last_contact,
            Some(Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_duplicate_message_ids_counted_once() {
        let me = mailbox("Me", "me@co.com");
        let ana = mailbox("Ana Silva", "ana@partner.com");
        let collector = collector(vec![
            message("m1", MessageDirection::Incoming, ana.clone(), vec![me.clone()], 1),
            message("m1", MessageDirection::Incoming, ana.clone(), vec![me.clone()], 1),
        ]);

        let fragments = collector.collect("ana").await.unwrap();
        assert_eq!(fragments[0].stats.received_count(), 1);
    }

    #[tokio::test]
    async fn test_outgoing_fans_out_to_every_recipient() {
        let me = mailbox("Me", "me@co.com");
        let collector = collector(vec![message(
            "m1",
            MessageDirection::Outgoing,
            me.clone(),
            vec![
                mailbox("Ana", "ana@partner.com"),
                mailbox("Bo", "bo@partner.com"),
            ],
            1,
        )]);

        let fragments = collector.collect("@partner.com").await.unwrap();
        assert_eq!(fragments.len(), 2);
        assert!(fragments.iter().all(|f| f.stats.sent_count() == 1));
    }

    #[tokio::test]
    async fn test_domain_query_filters_by_suffix() {
        let me = mailbox("Me", "me@co.com");
        let collector = collector(vec![
            message(
                "m1",
                MessageDirection::Incoming,
                mailbox("Ana", "ana@partner.com"),
                vec![me.clone()],
                1,
            ),
            message(
                "m2",
                MessageDirection::Incoming,
                mailbox("Eve", "eve@other.com"),
                vec![me.clone()],
                1,
            ),
        ]);

        let fragments = collector.collect("@partner.com").await.unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].primary_email(), Some("ana@partner.com"));
    }

    #[tokio::test]
    async fn test_display_name_upgraded_from_later_message() {
        let me = mailbox("Me", "me@co.com");
        let collector = collector(vec![
            message(
                "m1",
                MessageDirection::Incoming,
                mailbox("", "ana@partner.com"),
                vec![me.clone()],
                1,
            ),
            message(
                "m2",
                MessageDirection::Incoming,
                mailbox("Ana Silva", "ana@partner.com"),
                vec![me.clone()],
                2,
            ),
        ]);

        let fragments = collector.collect("ana").await.unwrap();
        assert_eq!(fragments[0].display_name, "Ana Silva");
    }
}
