//! Date and time utility functions
//!
//! Conversion helpers between the remote service's wire formats (RFC 3339
//! timestamps, date-only due values) and the chrono types used locally.

use chrono::{DateTime, NaiveDate, Utc};

/// Date format used for user-facing due dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a date string in YYYY-MM-DD format to NaiveDate
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT)
}

/// Format a NaiveDate to YYYY-MM-DD string
pub fn format_ymd(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Parse a due value from the wire.
///
/// The remote service sends due dates as RFC 3339 timestamps with a zeroed
/// time component (`2024-05-01T00:00:00.000Z`); some responses carry a bare
/// date. Both forms are accepted, anything else is `None`.
pub fn parse_wire_due(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    parse_date(value).ok()
}

/// Format a due date for the wire (RFC 3339, midnight UTC).
pub fn format_wire_due(due: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", format_ymd(due))
}

/// Parse an RFC 3339 `updated` timestamp, falling back to the current time.
///
/// The remote authority owns this field; a missing or malformed value on a
/// response should not fail the whole reconciliation.
pub fn parse_wire_updated(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Format an `updated` timestamp for the wire.
pub fn format_wire_updated(updated: DateTime<Utc>) -> String {
    updated.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
