// ⚖️ Reconciliation Engine - Which File A records exist in File B?
//
// Partitions File A into `matched` / `missing` against a lookup set built
// from File B's values at the comparison key:
//
//   lookup  = { text(b[key]) | b ∈ B, text(b[key]) != "" }
//   matched = [ a ∈ A | text(a[key]) != "" && text(a[key]) ∈ lookup ]
//   missing = A \ matched            (File A order preserved in both)
//
// Values compare as strings, never as typed values.

use crate::error::{CrossCheckError, Result};
use crate::table::{ComparisonKey, Record, Table, TableKind};
use serde::Serialize;
use std::collections::HashSet;

/// Inline preview size used by the web boundary
pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

// ============================================================================
// RECONCILIATION STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Lookup and partition were performed
    Completed,

    /// File A had no records; nothing was compared
    EmptyA,

    /// File B had no records; both partitions are left empty
    EmptyB,
}

impl ReconciliationStatus {
    pub fn message(&self) -> &'static str {
        match self {
            ReconciliationStatus::Completed => "Cross-check complete",
            ReconciliationStatus::EmptyA => "File A is empty; nothing to cross-check",
            ReconciliationStatus::EmptyB => "File B is empty; no contents to compare against",
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        !matches!(self, ReconciliationStatus::Completed)
    }
}

// ============================================================================
// PARTITION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionResult {
    pub status: ReconciliationStatus,

    /// None only when a short circuit happened before key resolution
    pub effective_key: Option<ComparisonKey>,

    /// Kind and columns of File A, used to serialize the partitions
    pub kind: TableKind,
    pub columns: Vec<String>,

    pub matched: Vec<Record>,
    pub missing: Vec<Record>,
    pub matched_count: usize,
    pub missing_count: usize,
    pub total_a_rows: usize,
}

impl PartitionResult {
    fn short_circuit(status: ReconciliationStatus, table_a: &Table) -> Self {
        PartitionResult {
            status,
            effective_key: None,
            kind: table_a.kind,
            columns: table_a.columns.clone(),
            matched: Vec::new(),
            missing: Vec::new(),
            matched_count: 0,
            missing_count: 0,
            total_a_rows: table_a.len(),
        }
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }

    /// First `limit` missing records, in File A order
    pub fn missing_preview(&self, limit: usize) -> &[Record] {
        &self.missing[..self.missing.len().min(limit)]
    }

    pub fn summary(&self) -> String {
        match &self.effective_key {
            Some(key) => format!(
                "{}: {} of {} records matched on '{}', {} missing",
                self.message(),
                self.matched_count,
                self.total_a_rows,
                key,
                self.missing_count
            ),
            None => self.message().to_string(),
        }
    }
}

// ============================================================================
// KEY RESOLUTION
// ============================================================================

/// Decide which key to compare on.
///
/// Any plain-text side forces `LineContent`. Two structured tables use the
/// requested key (or File A's first column) and it must be one of File A's
/// columns. A key that File B lacks is fine: it simply matches nothing.
pub fn resolve_key(
    table_a: &Table,
    table_b: &Table,
    requested: Option<&str>,
) -> Result<ComparisonKey> {
    if !table_a.is_structured() || !table_b.is_structured() {
        return Ok(ComparisonKey::LineContent);
    }

    let requested = requested.map(str::trim).filter(|k| !k.is_empty());

    let column = match requested {
        Some(name) => name.to_string(),
        None => match &table_a.default_key {
            Some(key) => key.name().to_string(),
            None => return Err(CrossCheckError::UnknownComparisonKey(String::new())),
        },
    };

    if table_a.has_column(&column) {
        Ok(ComparisonKey::Column(column))
    } else {
        Err(CrossCheckError::UnknownComparisonKey(column))
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// How many missing records `preview()` returns (default: 10)
    pub preview_limit: usize,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }

    pub fn with_preview_limit(preview_limit: usize) -> Self {
        ReconciliationEngine { preview_limit }
    }

    /// Partition `table_a` into records found / not found in `table_b`
    ///
    /// Example:
    /// ```
    /// use cross_check::{ingest, ReconciliationEngine};
    ///
    /// let a = ingest(b"id,name\n1,x\n2,y\n", "a.csv").unwrap();
    /// let b = ingest(b"id,name\n2,z\n", "b.csv").unwrap();
    ///
    /// let result = ReconciliationEngine::new().reconcile(&a, &b, Some("id")).unwrap();
    /// assert_eq!((result.matched_count, result.missing_count), (1, 1));
    /// ```
    pub fn reconcile(
        &self,
        table_a: &Table,
        table_b: &Table,
        requested_key: Option<&str>,
    ) -> Result<PartitionResult> {
        if table_a.is_empty() {
            tracing::info!("file A has no records, skipping cross-check");
            return Ok(PartitionResult::short_circuit(
                ReconciliationStatus::EmptyA,
                table_a,
            ));
        }

        // Every A record is semantically missing here, but the partitions
        // stay empty to keep the established response shape.
        if table_b.is_empty() {
            tracing::info!("file B has no records, skipping cross-check");
            return Ok(PartitionResult::short_circuit(
                ReconciliationStatus::EmptyB,
                table_a,
            ));
        }

        let key = resolve_key(table_a, table_b, requested_key)?;
        let lookup = self.build_lookup(table_b, &key);

        let (matched, missing): (Vec<Record>, Vec<Record>) = table_a
            .rows
            .iter()
            .cloned()
            .partition(|record| Self::is_found(record, &key, &lookup));

        tracing::debug!(
            key = %key,
            lookup_size = lookup.len(),
            matched = matched.len(),
            missing = missing.len(),
            "partitioned file A"
        );

        Ok(PartitionResult {
            status: ReconciliationStatus::Completed,
            effective_key: Some(key),
            kind: table_a.kind,
            columns: table_a.columns.clone(),
            matched_count: matched.len(),
            missing_count: missing.len(),
            total_a_rows: table_a.len(),
            matched,
            missing,
        })
    }

    /// Missing records to show inline
    pub fn preview<'a>(&self, result: &'a PartitionResult) -> &'a [Record] {
        result.missing_preview(self.preview_limit)
    }

    /// String-coerced, non-empty key values of every File B record
    fn build_lookup(&self, table_b: &Table, key: &ComparisonKey) -> HashSet<String> {
        table_b
            .rows
            .iter()
            .filter_map(|record| record.key_text(key))
            .collect()
    }

    /// Empty / absent values never match, whatever the lookup holds
    fn is_found(record: &Record, key: &ComparisonKey, lookup: &HashSet<String>) -> bool {
        match record.key_text(key) {
            Some(value) => lookup.contains(&value),
            None => false,
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconcile with default engine settings
pub fn reconcile(
    table_a: &Table,
    table_b: &Table,
    requested_key: Option<&str>,
) -> Result<PartitionResult> {
    ReconciliationEngine::new().reconcile(table_a, table_b, requested_key)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;

    fn people(rows: &[(&str, &str)]) -> Table {
        Table::structured(
            vec!["id".into(), "name".into()],
            rows.iter()
                .map(|(id, name)| Record::from_pairs([("id", *id), ("name", *name)]))
                .collect(),
        )
    }

    fn lines(items: &[&str]) -> Table {
        Table::plain_text(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_structured_scenario() {
        let a = people(&[("1", "x"), ("2", "y")]);
        let b = people(&[("2", "z")]);

        let result = reconcile(&a, &b, Some("id")).unwrap();

        assert_eq!(result.status, ReconciliationStatus::Completed);
        assert_eq!(result.matched, vec![Record::from_pairs([("id", "2"), ("name", "y")])]);
        assert_eq!(result.missing, vec![Record::from_pairs([("id", "1"), ("name", "x")])]);
        assert_eq!((result.matched_count, result.missing_count), (1, 1));
        assert_eq!(result.effective_key, Some(ComparisonKey::column("id")));

        println!("✅ Test passed: {}", result.summary());
    }

    #[test]
    fn test_plain_text_scenario() {
        let result = reconcile(&lines(&["foo", "bar"]), &lines(&["bar"]), None).unwrap();

        assert_eq!(result.matched, vec![Record::line("bar")]);
        assert_eq!(result.missing, vec![Record::line("foo")]);
        assert_eq!(result.effective_key, Some(ComparisonKey::LineContent));
    }

    #[test]
    fn test_requested_key_ignored_for_plain_text() {
        let result = reconcile(&lines(&["foo"]), &lines(&["foo"]), Some("zzz")).unwrap();
        assert_eq!(result.effective_key, Some(ComparisonKey::LineContent));
        assert_eq!(result.matched_count, 1);
    }

    #[test]
    fn test_mixed_kinds_compare_full_text() {
        let a = people(&[("1", "x"), ("2", "y")]);
        let b = lines(&["2,y"]);

        let result = reconcile(&a, &b, Some("id")).unwrap();

        assert_eq!(result.effective_key, Some(ComparisonKey::LineContent));
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.missing_count, 1);
        assert_eq!(result.kind, TableKind::Structured);
    }

    #[test]
    fn test_empty_a_short_circuits() {
        let a = people(&[]);
        let b = people(&[("1", "x")]);

        let result = reconcile(&a, &b, Some("zzz")).unwrap();

        assert_eq!(result.status, ReconciliationStatus::EmptyA);
        assert_eq!(result.message(), "File A is empty; nothing to cross-check");
        assert!(result.matched.is_empty() && result.missing.is_empty());
        assert_eq!((result.matched_count, result.missing_count), (0, 0));
    }

    #[test]
    fn test_empty_b_leaves_both_partitions_empty() {
        let a = people(&[("1", "x"), ("2", "y")]);

        let result = reconcile(&a, &people(&[]), Some("id")).unwrap();

        assert_eq!(result.status, ReconciliationStatus::EmptyB);
        assert_eq!(
            result.message(),
            "File B is empty; no contents to compare against"
        );
        assert!(result.matched.is_empty());
        assert!(result.missing.is_empty());
        assert_eq!((result.matched_count, result.missing_count), (0, 0));
        assert_eq!(result.total_a_rows, 2);
    }

    #[test]
    fn test_unknown_key_fails() {
        let a = people(&[("1", "x")]);
        let b = people(&[("1", "x")]);

        let err = reconcile(&a, &b, Some("zzz")).unwrap_err();
        assert!(matches!(err, CrossCheckError::UnknownComparisonKey(ref k) if k == "zzz"));
    }

    #[test]
    fn test_key_missing_from_b_matches_nothing() {
        let a = people(&[("1", "x"), ("2", "y")]);
        let b = Table::structured(
            vec!["code".into()],
            vec![Record::from_pairs([("code", "1")])],
        );

        let result = reconcile(&a, &b, Some("id")).unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.missing_count, 2);
    }

    #[test]
    fn test_default_key_is_first_column_of_a() {
        let a = people(&[("1", "x")]);
        let b = people(&[("1", "other")]);

        let result = reconcile(&a, &b, None).unwrap();
        assert_eq!(result.effective_key, Some(ComparisonKey::column("id")));
        assert_eq!(result.matched_count, 1);

        // Blank request behaves like no request
        let result = reconcile(&a, &b, Some("  ")).unwrap();
        assert_eq!(result.effective_key, Some(ComparisonKey::column("id")));
    }

    #[test]
    fn test_no_columns_in_a_is_unknown_key() {
        let a = Table::structured(vec![], vec![Record::Structured(Default::default())]);
        let b = people(&[("1", "x")]);

        let err = reconcile(&a, &b, None).unwrap_err();
        assert!(matches!(err, CrossCheckError::UnknownComparisonKey(_)));
    }

    #[test]
    fn test_string_coercion_equality() {
        let a = Table::structured(
            vec!["id".into()],
            vec![
                Record::from_pairs([("id", Scalar::Int(5))]),
                Record::from_pairs([("id", Scalar::Float(7.0))]),
            ],
        );
        let b = Table::structured(
            vec!["id".into()],
            vec![
                Record::from_pairs([("id", "5")]),
                Record::from_pairs([("id", Scalar::Int(7))]),
            ],
        );

        let result = reconcile(&a, &b, Some("id")).unwrap();
        assert_eq!(result.matched_count, 2);

        // And the other direction
        let result = reconcile(&b, &a, Some("id")).unwrap();
        assert_eq!(result.matched_count, 2);
    }

    #[test]
    fn test_empty_values_always_missing() {
        let a = Table::structured(
            vec!["id".into()],
            vec![
                Record::from_pairs([("id", Scalar::Empty)]),
                Record::from_pairs([("id", Scalar::Text(String::new()))]),
                Record::from_pairs([("other", "1")]),
            ],
        );
        let b = Table::structured(
            vec!["id".into()],
            vec![
                Record::from_pairs([("id", Scalar::Text(String::new()))]),
                Record::from_pairs([("id", Scalar::Empty)]),
            ],
        );

        let result = reconcile(&a, &b, Some("id")).unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.missing_count, 3);
    }

    #[test]
    fn test_lookup_excludes_empty_values() {
        let engine = ReconciliationEngine::new();
        let b = Table::structured(
            vec!["id".into()],
            vec![
                Record::from_pairs([("id", Scalar::Empty)]),
                Record::from_pairs([("id", "")]),
                Record::from_pairs([("id", "3")]),
                Record::from_pairs([("id", Scalar::Int(3))]),
            ],
        );

        let lookup = engine.build_lookup(&b, &ComparisonKey::column("id"));
        assert_eq!(lookup.len(), 1);
        assert!(lookup.contains("3"));
    }

    #[test]
    fn test_counts_add_up_and_order_is_kept() {
        let a = people(&[("4", "d"), ("1", "a"), ("3", "c"), ("2", "b"), ("5", "e")]);
        let b = people(&[("2", "?"), ("4", "?"), ("9", "?")]);

        let result = reconcile(&a, &b, Some("id")).unwrap();

        assert_eq!(result.matched_count + result.missing_count, result.total_a_rows);
        let matched_ids: Vec<String> = result
            .matched
            .iter()
            .filter_map(|r| r.key_text(&ComparisonKey::column("id")))
            .collect();
        assert_eq!(matched_ids, vec!["4", "2"]);

        let missing_ids: Vec<String> = result
            .missing
            .iter()
            .filter_map(|r| r.key_text(&ComparisonKey::column("id")))
            .collect();
        assert_eq!(missing_ids, vec!["1", "3", "5"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let a = people(&[("1", "x"), ("2", "y"), ("3", "z")]);
        let b = people(&[("3", "z"), ("1", "q")]);

        let first = reconcile(&a, &b, Some("name")).unwrap();
        let second = reconcile(&a, &b, Some("name")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_preview_is_capped() {
        let a = lines(&["1", "2", "3", "4", "5"]);
        let b = lines(&["3"]);

        let engine = ReconciliationEngine::with_preview_limit(2);
        let result = engine.reconcile(&a, &b, None).unwrap();

        assert_eq!(engine.preview(&result), &[Record::line("1"), Record::line("2")]);
        assert_eq!(result.missing_preview(100).len(), 4);
    }
}
