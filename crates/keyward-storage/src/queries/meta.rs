// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single vault_meta row.

use keyward_core::VaultMeta;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ts, ts_column};

pub fn load_meta(conn: &Connection) -> rusqlite::Result<Option<VaultMeta>> {
    conn.query_row(
        "SELECT salt, verification_hash, schema_version, kdf_iterations, totp_enabled,
                totp_secret_encrypted, recovery_codes_encrypted, created_at, updated_at
         FROM vault_meta WHERE id = 1",
        [],
        |row| {
            Ok(VaultMeta {
                salt: row.get(0)?,
                verification_hash: row.get(1)?,
                schema_version: row.get(2)?,
                kdf_iterations: row.get(3)?,
                totp_enabled: row.get(4)?,
                totp_secret_encrypted: row.get(5)?,
                recovery_codes_encrypted: row.get(6)?,
                created_at: ts_column(row, 7)?,
                updated_at: ts_column(row, 8)?,
            })
        },
    )
    .optional()
}

pub fn save_meta(conn: &Connection, meta: &VaultMeta) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO vault_meta (id, salt, verification_hash, schema_version, kdf_iterations,
                                 totp_enabled, totp_secret_encrypted, recovery_codes_encrypted,
                                 created_at, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             salt = excluded.salt,
             verification_hash = excluded.verification_hash,
             schema_version = excluded.schema_version,
             kdf_iterations = excluded.kdf_iterations,
             totp_enabled = excluded.totp_enabled,
             totp_secret_encrypted = excluded.totp_secret_encrypted,
             recovery_codes_encrypted = excluded.recovery_codes_encrypted,
             created_at = excluded.created_at,
             updated_at = excluded.updated_at",
        params![
            meta.salt,
            meta.verification_hash,
            meta.schema_version,
            meta.kdf_iterations,
            meta.totp_enabled,
            meta.totp_secret_encrypted,
            meta.recovery_codes_encrypted,
            ts(&meta.created_at),
            ts(&meta.updated_at),
        ],
    )?;
    Ok(())
}

pub fn delete_meta(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM vault_meta", [])?;
    Ok(())
}
