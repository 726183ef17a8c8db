//! Wire types shared by presence channels and transports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::{SmolStr, format_smolstr};

use crate::store::DocumentRow;

/// Longest user agent carried in a presence record, in UTF-16 code units
/// (the unit browser peers measure strings in).
pub const USER_AGENT_MAX_UNITS: usize = 50;

/// What one client tells the others about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub client_id: SmolStr,
    pub online_at: DateTime<Utc>,
    pub user_agent: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<SmolStr>,
}

impl PresenceRecord {
    /// Build a record stamped now.
    ///
    /// `user_agent` is cut to `USER_AGENT_MAX_UNITS`; an empty `user_name`
    /// counts as no name.
    pub fn new(client_id: impl Into<SmolStr>, user_agent: &str, user_name: Option<&str>) -> Self {
        Self {
            client_id: client_id.into(),
            online_at: Utc::now(),
            user_agent: truncate_utf16(user_agent, USER_AGENT_MAX_UNITS).into(),
            user_name: user_name.filter(|name| !name.is_empty()).map(SmolStr::from),
        }
    }
}

/// Longest prefix of `s` that fits in `max_units` UTF-16 code units.
///
/// A character that would straddle the limit is dropped whole.
fn truncate_utf16(s: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return &s[..idx];
        }
    }
    s
}

/// Presence roster: key to the records tracked under it.
pub type PresenceState = BTreeMap<SmolStr, Vec<PresenceRecord>>;

/// A row-level change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    /// `INSERT`, `UPDATE` or `DELETE`.
    pub event: SmolStr,
    pub schema: SmolStr,
    pub table: SmolStr,
    pub new: DocumentRow,
}

impl RowChange {
    pub fn update(table: impl Into<SmolStr>, new: DocumentRow) -> Self {
        Self {
            event: "UPDATE".into(),
            schema: "public".into(),
            table: table.into(),
            new,
        }
    }
}

/// Which row changes a channel wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    /// Event name, or `*` for all.
    pub event: SmolStr,
    pub schema: SmolStr,
    pub table: SmolStr,
    /// PostgREST-style `column=eq.value`.
    pub filter: Option<SmolStr>,
}

impl ChangeFilter {
    pub fn matches(&self, change: &RowChange) -> bool {
        if self.event != "*" && self.event != change.event {
            return false;
        }
        if self.schema != change.schema || self.table != change.table {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => column_equals(&change.new, filter),
        }
    }
}

fn column_equals(row: &DocumentRow, filter: &str) -> bool {
    let Some((column, expected)) = filter
        .split_once('=')
        .and_then(|(column, rhs)| Some((column, rhs.strip_prefix("eq.")?)))
    else {
        tracing::warn!(filter, "unsupported change filter");
        return false;
    };

    let Ok(Value::Object(fields)) = serde_json::to_value(row) else {
        return false;
    };
    match fields.get(column) {
        Some(Value::String(value)) => value == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

/// Everything a transport needs to open a document channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: SmolStr,
    /// Key this client's presence is tracked under.
    pub presence_key: SmolStr,
    pub changes: ChangeFilter,
}

impl ChannelConfig {
    /// Channel `doc-<id>`, keyed by client id, listening for updates to that row.
    pub fn for_document(doc_id: &str, client_id: &str, table: &str) -> Self {
        Self {
            name: format_smolstr!("doc-{}", doc_id),
            presence_key: client_id.into(),
            changes: ChangeFilter {
                event: "UPDATE".into(),
                schema: "public".into(),
                table: table.into(),
                filter: Some(format_smolstr!("id=eq.{}", doc_id)),
            },
        }
    }
}

/// Events delivered by a channel subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    RowChange(RowChange),
    /// The roster changed; read it from the subscription.
    PresenceSync,
    PresenceJoin {
        key: SmolStr,
        new_presences: Vec<PresenceRecord>,
    },
    PresenceLeave {
        key: SmolStr,
        left_presences: Vec<PresenceRecord>,
    },
    /// Raw status such as `SUBSCRIBED`, `CHANNEL_ERROR` or `CLOSED`.
    Status {
        status: SmolStr,
        error: Option<SmolStr>,
    },
}

impl TransportEvent {
    pub fn status(status: &str) -> Self {
        Self::Status {
            status: status.into(),
            error: None,
        }
    }
}
