//! Personal-contacts source.
//!
//! A thin mapping layer: the contacts folder already stores person-shaped
//! entries, so this collector just reshapes them into fragments and carries
//! the VIP flag through.

use crate::clients::{ClientError, ContactEntry, ContactsClient};
use rolodex_model::{PersonRecord, PersonSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maps contacts-folder entries into person fragments.
pub struct ContactsCollector {
    client: Arc<dyn ContactsClient>,
    max_results: usize,
    call_timeout: Duration,
}

impl ContactsCollector {
    /// Create a collector over the given client.
    #[must_use]
    pub fn new(client: Arc<dyn ContactsClient>, max_results: usize, call_timeout: Duration) -> Self {
        Self {
            client,
            max_results,
            call_timeout,
        }
    }

    /// Contacts matching `query`, as unmerged fragments.
    pub async fn collect(&self, query: &str) -> Result<Vec<PersonRecord>, ClientError> {
        let entries = tokio::time::timeout(self.call_timeout, self.client.search_contacts(query))
            .await
            .map_err(|_| ClientError::Timeout)??;

        debug!(count = entries.len(), "contacts search returned");
        Ok(entries
            .into_iter()
            .take(self.max_results)
            .map(to_fragment)
            .collect())
    }
}

fn to_fragment(entry: ContactEntry) -> PersonRecord {
    let display_name = if entry.display_name.trim().is_empty() {
        // Contacts saved from a bare address can lack a display name.
        match (&entry.given_name, &entry.surname) {
            (Some(given), Some(sur)) => format!("{given} {sur}"),
            (Some(given), None) => given.clone(),
            (None, Some(sur)) => sur.clone(),
            (None, None) => entry
                .email_addresses
                .first()
                .cloned()
                .unwrap_or_default(),
        }
    } else {
        entry.display_name.clone()
    };

    let mut record = PersonRecord::new(
        &display_name,
        entry.email_addresses.first().map(String::as_str),
        PersonSource::PersonalContacts,
    );
    for email in entry.email_addresses.iter().skip(1) {
        record.add_email(email);
    }
    for phone in entry.phone_numbers {
        record.add_phone(phone);
    }
    record.organization = entry.organization;
    record.department = entry.department;
    record.job_title = entry.job_title;
    record.is_vip = entry.is_vip;
    record
}
