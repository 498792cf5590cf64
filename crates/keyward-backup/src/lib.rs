// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault snapshots for the Keyward secret store.
//!
//! A snapshot is the full dataset export (metadata, sealed records,
//! categories, tags) behind a marker line and a SHA-256 checksum, with the
//! payload optionally sealed under a separate backup passphrase. This crate
//! also provides the file-based [`SafetyExporter`](keyward_core::SafetyExporter)
//! the vault runs before destroying content.

pub mod codec;
pub mod exporter;
pub mod format;

pub use codec::{BackupCodec, RestoreReport, Snapshot, VerifyReport};
pub use exporter::{read_snapshot, write_snapshot, FileSafetyExporter, SNAPSHOT_EXTENSION};
pub use format::{PayloadMode, MAGIC};
