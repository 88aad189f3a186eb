//! Collaborator interfaces to the backing directory/mailbox service.
//!
//! The discovery pipeline never talks to a wire protocol directly; it
//! consumes these traits, and the embedding application supplies
//! implementations bound to its session pool. Implementations must tolerate
//! concurrent use by multiple in-flight discovery requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rolodex_model::PhoneNumber;
use serde::{Deserialize, Serialize};

/// Failure of a single collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The backing service was unreachable or answered with an error
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded its time budget
    #[error("request timed out")]
    Timeout,
}

/// One directory (GAL) entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Primary routable address
    pub address: String,
    /// Display name as the directory has it
    pub display_name: String,
    /// Company / organization
    pub organization: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Job title
    pub job_title: Option<String>,
    /// Office location
    pub office_location: Option<String>,
    /// Known phone numbers
    pub phone_numbers: Vec<PhoneNumber>,
    /// Address routing type (usually `"SMTP"`)
    pub routing_type: String,
}

/// One personal-contacts entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEntry {
    /// Display name as stored in the contact
    pub display_name: String,
    /// First name
    pub given_name: Option<String>,
    /// Last name
    pub surname: Option<String>,
    /// Email addresses, first is primary
    pub email_addresses: Vec<String>,
    /// Known phone numbers
    pub phone_numbers: Vec<PhoneNumber>,
    /// Company / organization
    pub organization: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Job title
    pub job_title: Option<String>,
    /// User-flagged high-importance contact
    pub is_vip: bool,
}

/// A mailbox participant on a historical message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailbox {
    /// Routable address
    pub address: String,
    /// Display name, may be empty
    pub name: String,
}

/// Whether the mailbox owner received or sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    /// Arrived in the owner's inbox
    Incoming,
    /// Sent by the owner
    Outgoing,
}

/// Minimal projection of one historical message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Service-assigned stable message identifier
    pub message_id: String,
    /// Incoming or outgoing relative to the mailbox owner
    pub direction: MessageDirection,
    /// Message sender
    pub sender: Mailbox,
    /// Message recipients
    pub recipients: Vec<Mailbox>,
    /// Sent/received timestamp
    pub timestamp: DateTime<Utc>,
}

/// Directory (GAL) lookups, one method per search strategy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Verbatim lookup of the literal query string.
    async fn resolve_exact(&self, text: &str) -> Result<Vec<DirectoryEntry>, ClientError>;

    /// Prefix/substring lookup (query treated as a wildcard fragment).
    async fn resolve_partial(&self, prefix: &str) -> Result<Vec<DirectoryEntry>, ClientError>;

    /// Every entry whose address belongs to `domain`.
    async fn resolve_domain(&self, domain: &str) -> Result<Vec<DirectoryEntry>, ClientError>;

    /// Broad candidate pool for approximate matching against `text`.
    async fn resolve_fuzzy(&self, text: &str) -> Result<Vec<DirectoryEntry>, ClientError>;
}

/// Personal contacts folder search.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactsClient: Send + Sync {
    /// Contacts matching `term` on any name or address field.
    async fn search_contacts(&self, term: &str) -> Result<Vec<ContactEntry>, ClientError>;
}

/// Historical message traffic scans.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryClient: Send + Sync {
    /// Messages exchanged within the last `window_days` days.
    async fn scan_messages(&self, window_days: u32) -> Result<Vec<MessageSummary>, ClientError>;
}
