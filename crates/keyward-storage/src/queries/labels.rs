// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category and tag rows.

use keyward_core::{Category, Tag};
use rusqlite::{params, Connection};

use super::{ts, ts_column};

pub fn list_categories(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, name, is_default, created_at FROM categories ORDER BY id")?;
    stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            is_default: row.get(2)?,
            created_at: ts_column(row, 3)?,
        })
    })?
    .collect()
}

pub fn upsert_category(conn: &Connection, category: &Category) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, is_default, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![
            category.id,
            category.name,
            category.is_default,
            ts(&category.created_at)
        ],
    )?;
    Ok(())
}

pub fn insert_category_if_absent(conn: &Connection, category: &Category) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO categories (id, name, is_default, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            category.id,
            category.name,
            category.is_default,
            ts(&category.created_at)
        ],
    )?;
    Ok(changed == 1)
}

pub fn delete_custom_categories(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM categories WHERE is_default = 0", [])
}

pub fn delete_all_categories(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM categories", [])
}

pub fn list_tags(conn: &Connection) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM tags ORDER BY id")?;
    stmt.query_map([], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: ts_column(row, 2)?,
        })
    })?
    .collect()
}

pub fn upsert_tag(conn: &Connection, tag: &Tag) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tags (id, name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![tag.id, tag.name, ts(&tag.created_at)],
    )?;
    Ok(())
}

pub fn insert_tag_if_absent(conn: &Connection, tag: &Tag) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO tags (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![tag.id, tag.name, ts(&tag.created_at)],
    )?;
    Ok(changed == 1)
}

pub fn delete_all_tags(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM tags", [])
}
