//! Scalar coercion between raw cell strings and typed field values
//!
//! Every `read` function here is total: malformed or missing input resolves
//! to the documented fallback instead of an error. The matching `render`
//! functions produce the exact strings the readers accept.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Separator for lists of plain scalars (label ids, story ids, sizes)
pub const LIST_DELIMITER: char = ';';

/// Date format used in cells
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a base-10 integer, falling back to `default`
pub fn integer(cell: &str, default: i64) -> i64 {
    cell.trim().parse().unwrap_or(default)
}

/// Only the literal `"true"` is true
pub fn flag(cell: &str) -> bool {
    cell == "true"
}

/// Trimmed text, always present
pub fn text(cell: &str) -> String {
    cell.trim().to_string()
}

/// Trimmed text; empty means unset
pub fn optional(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Delimited list of scalars.
///
/// A cell that looks like a JSON array is parsed as one, so values written by
/// other exporters still load. A JSON array that fails to parse yields an
/// empty list.
pub fn delimited(cell: &str) -> Vec<String> {
    let trimmed = cell.trim();
    if trimmed.starts_with('[') {
        return json_list(trimmed);
    }
    trimmed
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON-encoded list of structured values; any parse error yields an empty list
pub fn json_list<T: DeserializeOwned>(cell: &str) -> Vec<T> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(trimmed).unwrap_or_default()
}

/// Optional calendar date.
///
/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
pub fn date(cell: &str) -> Option<NaiveDate> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Required calendar date; today when missing or unreadable
pub fn date_or_today(cell: &str) -> NaiveDate {
    date(cell).unwrap_or_else(|| Utc::now().date_naive())
}

/// Optional instant. Bare dates are read as midnight UTC.
pub fn timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

/// Required instant; now when missing or unreadable
pub fn timestamp_or_now(cell: &str) -> DateTime<Utc> {
    timestamp(cell).unwrap_or_else(Utc::now)
}

/// Identifier; a fresh v4 UUID when missing
pub fn id_or_new(cell: &str) -> String {
    optional(cell).unwrap_or_else(new_id)
}

/// Generate a new identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Closed choice parsed via `FromStr`, or `default`
pub fn choice<T: FromStr>(cell: &str, default: T) -> T {
    cell.trim().parse().unwrap_or(default)
}

/// Render a boolean as `"true"`/`"false"`
pub fn render_flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Render an optional string; unset becomes empty
pub fn render_optional(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Join scalars with the list delimiter
pub fn render_delimited(values: &[String]) -> String {
    values.join(&LIST_DELIMITER.to_string())
}

/// Encode a nested value as JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// Render a date as `YYYY-MM-DD`
pub fn render_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Render an instant as RFC 3339, keeping sub-second precision
pub fn render_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
