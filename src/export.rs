// 📤 Serializer - partitions back into downloadable CSV bytes
//
// CSV is the canonical output regardless of the input format.

use crate::reconciliation::PartitionResult;
use crate::table::{Record, Scalar, TableKind, LINE_CONTENT};
use anyhow::{Context, Result};

/// Serialize records, deriving the header from the records themselves
/// (union of keys in first-seen order).
pub fn serialize(records: &[Record], kind: TableKind) -> Result<Vec<u8>> {
    serialize_with_columns(records, kind, &[])
}

/// Serialize records using `columns` as the header when given.
///
/// Keys found in records but not in `columns` are appended after them.
pub fn serialize_with_columns(
    records: &[Record],
    kind: TableKind,
    columns: &[String],
) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());

    match kind {
        TableKind::PlainText => {
            writer.write_record([LINE_CONTENT])?;
            for record in records {
                writer.write_record([record.full_text()])?;
            }
        }
        TableKind::Structured => {
            let header = header_for(records, columns);
            if !header.is_empty() {
                writer.write_record(&header)?;
            }

            for record in records {
                let row: Vec<String> = header
                    .iter()
                    .map(|column| record.get(column).map(Scalar::to_text).unwrap_or_default())
                    .collect();
                writer.write_record(&row)?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))
}

fn header_for(records: &[Record], columns: &[String]) -> Vec<String> {
    let mut header: Vec<String> = columns.to_vec();

    for record in records {
        if let Record::Structured(fields) = record {
            for key in fields.keys() {
                if !header.contains(key) {
                    header.push(key.clone());
                }
            }
        }
    }

    header
}

/// Serialized `(matched, missing)` partitions of a result
pub fn serialize_result(result: &PartitionResult) -> Result<(Vec<u8>, Vec<u8>)> {
    let matched = serialize_with_columns(&result.matched, result.kind, &result.columns)
        .context("Failed to serialize matched records")?;
    let missing = serialize_with_columns(&result.missing, result.kind, &result.columns)
        .context("Failed to serialize missing records")?;

    Ok((matched, missing))
}

// ============================================================================
// TESTS
// ============================================================================
