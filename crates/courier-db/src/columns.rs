//! Column encodings shared by the stores.
//!
//! Identifiers are stored as hyphenated UUID text and timestamps as RFC 3339
//! UTC text with fixed microsecond precision, so lexical order in SQL equals
//! chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{ErrorCode, Row};
use uuid::Uuid;

/// Kind of constraint a failed write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A `UNIQUE` or primary key constraint.
    Unique,
    /// A `REFERENCES` constraint.
    ForeignKey,
    /// `NOT NULL`, `CHECK` and anything else.
    Other,
}

/// Classifies a SQLite error as a constraint violation, if it is one.
pub fn constraint_violation(err: &rusqlite::Error) -> Option<ConstraintViolation> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintViolation::Unique,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintViolation::ForeignKey,
                _ => ConstraintViolation::Other,
            })
        }
        _ => None,
    }
}

/// Formats a timestamp the way every table stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current wall-clock time, truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    // Round-trip through the stored form so values read back compare equal.
    DateTime::parse_from_rfc3339(&format_timestamp(now))
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Reads a UUID stored as text.
pub fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads an RFC 3339 timestamp stored as text.
pub fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw, idx)
}

/// Reads a nullable RFC 3339 timestamp stored as text.
pub fn get_optional_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(&s, idx)).transpose()
}

fn parse_timestamp(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
