//! Domain types shared by the ingestion, retrieval and serving paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a ticket table.
///
/// Cells that were empty in the source file are absent from `fields`, so a
/// lookup miss is the only representation of a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub fields: BTreeMap<String, String>,
}

impl TicketRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v): &(String, String)| !v.trim().is_empty())
            .collect();
        Self { fields }
    }

    /// Non-empty value of `column`, if any.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// A single nearest-neighbour result.
///
/// `row` is the position in the reference table. Negative values are
/// sentinels for "no neighbour" and are skipped downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub row: i64,
    pub distance: f32,
}

impl RetrievalHit {
    pub fn new(row: i64, distance: f32) -> Self { Self { row, distance } }

    /// Resolve the row against a table of `len` rows.
    pub fn row_index(&self, len: usize) -> Option<usize> {
        usize::try_from(self.row).ok().filter(|r| *r < len)
    }

    pub fn similarity(&self) -> f32 { 1.0 / (1.0 + self.distance) }
}

/// Text handed to the generator plus the rows it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    pub text: String,
    pub indices: Vec<usize>,
    pub used_fallback: bool,
}

/// One row of the insight log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub timestamp: String,
    pub query: String,
    pub insight: String,
}

/// A retrieved ticket as shown to users and returned over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketView {
    pub ticket_id: String,
    pub summary: String,
    pub status: String,
    pub text: String,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<TicketDetails>,
}

/// Extra fields pulled from the original export when it is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub store_number: Option<String>,
    pub priority: Option<String>,
    pub business_priority: Option<String>,
    pub description: Option<String>,
    pub last_comment: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub blocked_status: Option<String>,
    pub request_status: Option<String>,
    pub epic_link: Option<String>,
}
