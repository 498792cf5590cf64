// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety-net snapshots written to the backup directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use keyward_core::{ExportReceipt, KeywardError, SafetyExporter};

use crate::codec::{BackupCodec, Snapshot};

/// File extension used for snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "kwb";

/// Writes an unsealed snapshot into a directory before destructive operations.
pub struct FileSafetyExporter {
    codec: BackupCodec,
    directory: PathBuf,
    prefix: String,
}

impl FileSafetyExporter {
    pub fn new(codec: BackupCodec, directory: impl Into<PathBuf>) -> Self {
        Self {
            codec,
            directory: directory.into(),
            prefix: "safety".to_string(),
        }
    }

    /// Use `prefix` instead of `safety` in generated file names.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn next_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.directory
            .join(format!("keyward-{}-{stamp}.{SNAPSHOT_EXTENSION}", self.prefix))
    }
}

#[async_trait]
impl SafetyExporter for FileSafetyExporter {
    async fn export_snapshot(&self) -> Result<ExportReceipt, KeywardError> {
        let snapshot = self.codec.create_snapshot(None).await?;
        let path = self.next_path();
        let receipt = write_snapshot(&snapshot, &path).await?;
        info!(location = %receipt.location, size = receipt.size, "safety snapshot written");
        Ok(receipt)
    }
}

/// Write `snapshot` to `path`, creating parent directories.
pub async fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<ExportReceipt, KeywardError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(KeywardError::storage)?;
    }
    tokio::fs::write(path, &snapshot.bytes)
        .await
        .map_err(KeywardError::storage)?;

    Ok(ExportReceipt {
        location: path.display().to_string(),
        checksum: snapshot.checksum.clone(),
        size: snapshot.bytes.len(),
    })
}

/// Read snapshot bytes from `path`.
pub async fn read_snapshot(path: &Path) -> Result<Vec<u8>, KeywardError> {
    tokio::fs::read(path).await.map_err(KeywardError::storage)
}
