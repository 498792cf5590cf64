// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.
//!
//! Queries are synchronous functions over a `rusqlite::Connection` so that
//! several of them can run inside one transaction on the writer thread.

pub mod labels;
pub mod meta;
pub mod records;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

/// ISO-8601 text form used for every timestamp column.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Reads a timestamp column written by [`ts`] (or by SQLite's `strftime`).
pub(crate) fn ts_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
