// 🏷️ Header Negotiation - candidate comparison keys for two ingested tables
//
// Read-only pre-flight step. It never partitions anything; the
// reconciliation engine resolves the final key on its own.

use crate::table::{ComparisonKey, Table, LINE_CONTENT};
use serde::Serialize;

/// Shown when two structured files have no usable headers
pub const NO_HEADERS_FOUND: &str = "No headers found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "headers", rename_all = "snake_case")]
pub enum HeaderCandidates {
    /// Union of both files' columns, A's first
    Columns(Vec<String>),

    /// Both files are structured but neither has a usable header
    NoHeadersFound,

    /// At least one file is plain text: the whole line is the only key
    LineContent,
}

impl HeaderCandidates {
    /// Names to offer the user, sentinels included
    pub fn labels(&self) -> Vec<String> {
        match self {
            HeaderCandidates::Columns(columns) => columns.clone(),
            HeaderCandidates::NoHeadersFound => vec![NO_HEADERS_FOUND.to_string()],
            HeaderCandidates::LineContent => vec![LINE_CONTENT.to_string()],
        }
    }

    /// Whether the caller may pick a key freely
    pub fn is_selectable(&self) -> bool {
        matches!(self, HeaderCandidates::Columns(_))
    }

    /// The key used when nothing is picked
    pub fn default_key(&self) -> Option<ComparisonKey> {
        match self {
            HeaderCandidates::Columns(columns) => {
                columns.first().cloned().map(ComparisonKey::Column)
            }
            HeaderCandidates::NoHeadersFound => None,
            HeaderCandidates::LineContent => Some(ComparisonKey::LineContent),
        }
    }
}

/// Compute the comparison keys offered for `table_a` against `table_b`.
pub fn candidate_keys(table_a: &Table, table_b: &Table) -> HeaderCandidates {
    if !table_a.is_structured() || !table_b.is_structured() {
        return HeaderCandidates::LineContent;
    }

    let mut columns: Vec<String> = Vec::new();
    for column in table_a.columns.iter().chain(table_b.columns.iter()) {
        if column.trim().is_empty() || columns.contains(column) {
            continue;
        }
        columns.push(column.clone());
    }

    if columns.is_empty() {
        HeaderCandidates::NoHeadersFound
    } else {
        HeaderCandidates::Columns(columns)
    }
}
