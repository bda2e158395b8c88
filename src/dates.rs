// 📅 Canonical date normalization
//
// Date-typed cells become `YYYY-MM-DD` text at ingestion time.
// Anything that cannot be read as a date becomes an empty string.

use calamine::{ExcelDateTime, ExcelDateTimeType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest serial Excel can represent (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Convert a spreadsheet date cell into `YYYY-MM-DD`.
///
/// The cell carries its workbook's epoch (1900 or 1904), so the same
/// calendar day reads the same from either kind of workbook. Time of day
/// is dropped.
pub fn normalize_excel(dt: &ExcelDateTime) -> String {
    let serial = dt.as_f64();
    if !serial.is_finite() || serial < 0.0 || serial > MAX_EXCEL_SERIAL + 1.0 {
        return String::new();
    }

    dt.as_datetime()
        .map(|d| d.date().format(CANONICAL_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Render a duration cell (`[h]:mm:ss` style formats) as `H:MM:SS`
pub fn format_duration(dt: &ExcelDateTime) -> String {
    let Some(duration) = dt.as_duration() else {
        return String::new();
    };

    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!("{}{}:{:02}:{:02}", sign, total / 3600, (total / 60) % 60, total % 60)
}

/// Normalize a textual date (ISO 8601 date, date-time or RFC 3339) into
/// `YYYY-MM-DD`. Returns an empty string when nothing matches.
pub fn normalize_iso(value: &str) -> String {
    parse_date(value)
        .map(|d| d.format(CANONICAL_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}
