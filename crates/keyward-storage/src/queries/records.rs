// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sealed record rows.

use keyward_core::StoredRecord;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ts, ts_column};

const COLUMNS: &str = "id, category, envelope, created_at, updated_at";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        id: row.get(0)?,
        category: row.get(1)?,
        envelope: row.get(2)?,
        created_at: ts_column(row, 3)?,
        updated_at: ts_column(row, 4)?,
    })
}

pub fn get_record(conn: &Connection, id: &str) -> rusqlite::Result<Option<StoredRecord>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM records WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Insert or fully replace a record.
pub fn upsert_record(conn: &Connection, record: &StoredRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO records (id, category, envelope, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             category = excluded.category,
             envelope = excluded.envelope,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at",
        params![
            record.id,
            record.category,
            record.envelope,
            ts(&record.created_at),
            ts(&record.updated_at),
        ],
    )?;
    Ok(())
}

/// Insert unless the id exists. Returns whether a row was written.
pub fn insert_record_if_absent(conn: &Connection, record: &StoredRecord) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO records (id, category, envelope, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.id,
            record.category,
            record.envelope,
            ts(&record.created_at),
            ts(&record.updated_at),
        ],
    )?;
    Ok(changed == 1)
}

pub fn delete_record(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM records WHERE id = ?1", params![id])? == 1)
}

pub fn delete_all_records(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM records", [])
}

pub fn list_record_ids(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM records ORDER BY id")?;
    stmt.query_map([], |row| row.get(0))?.collect()
}

pub fn list_records(conn: &Connection) -> rusqlite::Result<Vec<StoredRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM records ORDER BY id"))?;
    stmt.query_map([], from_row)?.collect()
}
