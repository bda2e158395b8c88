// 📋 Table Model - Uniform in-memory shape for every ingested file
//
// A Table is either Structured (named columns, one map per row) or
// PlainText (one string per non-blank line). Every component branches on
// TableKind / Record instead of inspecting values at runtime.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Display name of the whole-line comparison key
pub const LINE_CONTENT: &str = "Line Content";

// ============================================================================
// SCALAR VALUES
// ============================================================================

/// A single cell value, kept in its native representation until compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Canonical textual form. Comparisons are always made on this string,
    /// so `Int(5)`, `Float(5.0)` and `Text("5")` are the same key.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Empty => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => {
                // Integers without decimals
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Scalar::Text(s) => s.clone(),
        }
    }

    /// True for values that can never take part in a match
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Empty => true,
            Scalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Scalar::Empty
        } else {
            Scalar::Text(s.to_string())
        }
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Scalar::Empty
        } else {
            Scalar::Text(s)
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Float(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ============================================================================
// COMPARISON KEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonKey {
    /// Compare on a named column (structured tables)
    Column(String),

    /// Compare on the record's full text (plain-text tables)
    LineContent,
}

impl ComparisonKey {
    pub fn column(name: impl Into<String>) -> Self {
        ComparisonKey::Column(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ComparisonKey::Column(name) => name,
            ComparisonKey::LineContent => LINE_CONTENT,
        }
    }

    pub fn is_line_content(&self) -> bool {
        matches!(self, ComparisonKey::LineContent)
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ComparisonKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One row of a Table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Structured(IndexMap<String, Scalar>),
    Line(String),
}

impl Record {
    /// Build a structured record from `(column, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        Record::Structured(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn line(text: impl Into<String>) -> Self {
        Record::Line(text.into())
    }

    /// Value stored under `column` (None for lines or unknown columns)
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        match self {
            Record::Structured(fields) => fields.get(column),
            Record::Line(_) => None,
        }
    }

    /// The record as a single string: the line itself, or the canonical
    /// text of each field joined with commas in column order.
    pub fn full_text(&self) -> String {
        match self {
            Record::Line(text) => text.clone(),
            Record::Structured(fields) => fields
                .values()
                .map(Scalar::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// String-coerced value at `key`, or None when absent or empty.
    pub fn key_text(&self, key: &ComparisonKey) -> Option<String> {
        let text = match key {
            ComparisonKey::LineContent => self.full_text(),
            ComparisonKey::Column(column) => self.get(column)?.to_text(),
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Structured,
    PlainText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub default_key: Option<ComparisonKey>,
}

impl Table {
    /// Structured table; the first column is the default key.
    pub fn structured(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let default_key = columns.first().cloned().map(ComparisonKey::Column);

        Table {
            kind: TableKind::Structured,
            columns,
            rows,
            default_key,
        }
    }

    /// Structured file with no rows at all (not even a header).
    pub fn empty_structured() -> Self {
        Table::structured(Vec::new(), Vec::new())
    }

    pub fn plain_text(lines: Vec<String>) -> Self {
        Table {
            kind: TableKind::PlainText,
            columns: Vec::new(),
            rows: lines.into_iter().map(Record::Line).collect(),
            default_key: Some(ComparisonKey::LineContent),
        }
    }

    pub fn is_structured(&self) -> bool {
        self.kind == TableKind::Structured
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
