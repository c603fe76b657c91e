//! Ticket and worklog models.
//!
//! Several ticket fields change shape between the list and single-fetch
//! endpoints (`status` is a plain string in lists but an object with a
//! `name` when fetched by id), so they go through the tolerant decoders.

use serde::Deserialize;

use crate::decode::{flexible_int, flexible_string, nullable_list};
use crate::identity::{EntityId, IdentityKeys};

/// Identifier keys of [`Ticket`]: `id`, falling back to `ticketId`.
#[derive(Debug, Clone, Copy)]
pub struct TicketKeys;

impl IdentityKeys for TicketKeys {
    const PRIMARY: &'static str = "id";
    const FALLBACK: &'static str = "ticketId";
}

/// A helpdesk ticket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket id.
    #[serde(flatten)]
    pub id: EntityId<TicketKeys>,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Body of the first message.
    #[serde(default)]
    pub description: Option<String>,

    /// Status name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub status: Option<String>,

    /// Priority name.
    #[serde(default, deserialize_with = "flexible_string")]
    pub priority: Option<String>,

    /// Brand the ticket belongs to.
    #[serde(default, deserialize_with = "flexible_string")]
    pub brand: Option<String>,

    /// Channel the ticket came in through (email, portal, phone, ...).
    #[serde(default, deserialize_with = "flexible_string")]
    pub channel: Option<String>,

    /// Ticket type.
    #[serde(default, rename = "type", deserialize_with = "flexible_string")]
    pub ticket_type: Option<String>,

    /// Assigned agent.
    #[serde(default, deserialize_with = "flexible_int")]
    pub agent_id: Option<i64>,

    /// Contact who raised the ticket.
    #[serde(default, deserialize_with = "flexible_int")]
    pub contact_id: Option<i64>,

    /// Assigned agent group.
    #[serde(default, deserialize_with = "flexible_int")]
    pub group_id: Option<i64>,

    /// Free-form tags. `null` reads as no tags.
    #[serde(default, deserialize_with = "nullable_list")]
    pub tags: Vec<String>,

    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time as sent by the server.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Ticket {
    /// Returns the subject, or a placeholder if empty.
    pub fn display_subject(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(no subject)")
    }
}

/// Time logged by an agent against a ticket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worklog {
    /// Worklog id.
    #[serde(default, deserialize_with = "flexible_int")]
    pub id: Option<i64>,

    /// Ticket the time was logged against.
    #[serde(default, deserialize_with = "flexible_int")]
    pub ticket_id: Option<i64>,

    /// Ticket subject (some endpoints embed the ticket object instead).
    #[serde(default, deserialize_with = "flexible_string")]
    pub ticket: Option<String>,

    /// Agent who logged the time.
    #[serde(default, deserialize_with = "flexible_string")]
    pub agent: Option<String>,

    /// Logged minutes.
    #[serde(default, deserialize_with = "flexible_int")]
    pub minutes: Option<i64>,

    /// Note attached to the entry.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the time is billable.
    #[serde(default)]
    pub is_billable: Option<bool>,

    /// When the time was logged.
    #[serde(default)]
    pub created_at: Option<String>,
}
