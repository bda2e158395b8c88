// 📥 File Ingestor - raw bytes + filename → uniform Table
//
// Format is chosen from the filename extension:
//   spreadsheet (xlsx, xlsm, xlsb, xls, ods) → calamine, first worksheet
//   delimited   (csv, tsv)                   → csv crate
//   anything else                            → plain text, one record per line

use crate::dates;
use crate::error::{CrossCheckError, Result};
use crate::table::{Record, Scalar, Table};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use indexmap::IndexMap;
use std::io::Cursor;
use std::path::Path;

// ============================================================================
// FORMAT DETECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Excel / OpenDocument workbook
    Spreadsheet,

    /// Delimited text; `None` means sniff the delimiter from the content
    Delimited { delimiter: Option<u8> },

    /// Line-oriented text without a header row
    PlainText,
}

impl SourceFormat {
    /// Detect the format from a filename's extension (case-insensitive)
    ///
    /// # Examples:
    /// ```
    /// use cross_check::ingest::SourceFormat;
    ///
    /// assert_eq!(SourceFormat::detect("Report.XLSX"), SourceFormat::Spreadsheet);
    /// assert_eq!(SourceFormat::detect("notes.txt"), SourceFormat::PlainText);
    /// ```
    pub fn detect(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SourceFormat::Spreadsheet,
            "csv" => SourceFormat::Delimited { delimiter: None },
            "tsv" => SourceFormat::Delimited {
                delimiter: Some(b'\t'),
            },
            _ => SourceFormat::PlainText,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Delimited { .. } => "delimited text",
            SourceFormat::PlainText => "plain text",
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, SourceFormat::PlainText)
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Ingest a whole file into a Table.
///
/// Fails with `UnreadableFile` when the bytes cannot be parsed as the
/// format implied by `filename`. Plain text never fails.
pub fn ingest(bytes: &[u8], filename: &str) -> Result<Table> {
    let format = SourceFormat::detect(filename);

    let table = match format {
        SourceFormat::Spreadsheet => ingest_spreadsheet(bytes, filename)?,
        SourceFormat::Delimited { delimiter } => ingest_delimited(bytes, filename, delimiter)?,
        SourceFormat::PlainText => ingest_plain_text(bytes),
    };

    tracing::debug!(
        filename,
        format = format.name(),
        columns = table.columns.len(),
        rows = table.len(),
        "ingested file"
    );

    Ok(table)
}

/// Read a file from disk and ingest it under its own filename
pub fn ingest_path(path: &Path) -> anyhow::Result<Table> {
    use anyhow::Context;

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.txt");

    Ok(ingest(&bytes, filename)?)
}

// ============================================================================
// STRUCTURED SOURCES
// ============================================================================

fn ingest_spreadsheet(bytes: &[u8], filename: &str) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| CrossCheckError::unreadable(filename, e))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(Table::empty_structured());
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CrossCheckError::unreadable(filename, e))?;

    let grid: Vec<Vec<Scalar>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_scalar).collect())
        .collect();

    Ok(build_structured(grid))
}

fn cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty => Scalar::Empty,
        Data::String(s) => Scalar::from(s.as_str()),
        Data::Float(n) => Scalar::Float(*n),
        Data::Int(n) => Scalar::Int(*n),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::Error(e) => Scalar::Text(e.to_string()),
        Data::DateTime(dt) if dt.is_duration() => Scalar::Text(dates::format_duration(dt)),
        // Invalid dates normalize to "" and stay Text so they never match
        Data::DateTime(dt) => Scalar::Text(dates::normalize_excel(dt)),
        Data::DateTimeIso(s) => Scalar::Text(dates::normalize_iso(s)),
        Data::DurationIso(s) => Scalar::from(s.as_str()),
    }
}

fn ingest_delimited(bytes: &[u8], filename: &str, delimiter: Option<u8>) -> Result<Table> {
    let content = decode_text(bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            CrossCheckError::unreadable(filename, format!("line {}: {}", line_num + 1, e))
        })?;
        grid.push(record.iter().map(Scalar::from).collect());
    }

    Ok(build_structured(grid))
}

/// Turn a 2-D grid into a structured Table.
///
/// Row 0 is the header row. Header cells are trimmed and blank ones are
/// dropped together with their values. A repeated header appears once in
/// `columns`; the later position's value wins in each record. Data rows
/// whose cells are all blank (`,,,` or formatting-only spreadsheet rows)
/// are skipped.
fn build_structured(grid: Vec<Vec<Scalar>>) -> Table {
    let mut grid = grid.into_iter();

    let Some(header_row) = grid.next() else {
        return Table::empty_structured();
    };

    let headers: Vec<Option<String>> = header_row
        .iter()
        .map(|cell| {
            let text = cell.to_text();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for header in headers.iter().flatten() {
        if !columns.contains(header) {
            columns.push(header.clone());
        }
    }

    let rows = grid
        .filter(|row| row.iter().any(|cell| !cell.is_blank()))
        .map(|row| {
            let mut fields = IndexMap::with_capacity(columns.len());
            for (idx, header) in headers.iter().enumerate() {
                let Some(header) = header else { continue };
                let value = row.get(idx).cloned().unwrap_or(Scalar::Empty);
                fields.insert(header.clone(), value);
            }
            Record::Structured(fields)
        })
        .collect();

    Table::structured(columns, rows)
}

/// Pick the most likely field delimiter by checking consistency across the
/// first few lines. Comma wins when nothing produces more than one field.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(10)
        .collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delimiter in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;

        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

// ============================================================================
// PLAIN TEXT
// ============================================================================

fn ingest_plain_text(bytes: &[u8]) -> Table {
    let content = decode_text(bytes);

    let lines = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    Table::plain_text(lines)
}

/// Decode bytes as UTF-8 (dropping a BOM), falling back to Windows-1252
/// for files exported by older spreadsheet tools.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
