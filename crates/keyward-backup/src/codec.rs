// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot creation, verification and restore.

use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keyward_config::model::{BackupConfig, SecurityConfig};
use keyward_core::{
    DatasetExport, KeywardError, MergeReport, RestoreMode, VaultStore, EXPORT_FORMAT_VERSION,
};
use keyward_vault::{crypto, kdf};

use crate::format::{PayloadMode, SealedPayload, SnapshotFile};

/// A freshly created snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of the stored payload.
    pub checksum: String,
    pub mode: PayloadMode,
}

/// Result of [`BackupCodec::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<PayloadMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a restore changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RestoreReport {
    Overwrite {
        records: usize,
        categories: usize,
        tags: usize,
    },
    Merge {
        #[serde(flatten)]
        report: MergeReport,
        /// Whether the snapshot's metadata was adopted by an empty store.
        adopted_metadata: bool,
    },
}

/// Turns a store's dataset into snapshot bytes and back.
#[derive(Clone)]
pub struct BackupCodec {
    store: Arc<dyn VaultStore>,
    iterations: u32,
    /// Accepted iteration counts for sealed payloads being restored.
    min_iterations: u32,
    max_iterations: u32,
}

impl BackupCodec {
    pub fn new(
        store: Arc<dyn VaultStore>,
        backup: &BackupConfig,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            store,
            iterations: backup.iterations,
            min_iterations: security.min_iterations,
            max_iterations: security.max_iterations,
        }
    }

    /// Export the whole dataset, sealing it under `passphrase` if given.
    ///
    /// Records stay sealed under the vault key either way.
    pub async fn create_snapshot(
        &self,
        passphrase: Option<&SecretString>,
    ) -> Result<Snapshot, KeywardError> {
        let export = self.store.export_dataset().await?;
        let json = Zeroizing::new(serde_json::to_vec(&export)?);

        let file = match passphrase {
            None => SnapshotFile::new(PayloadMode::Plain, json.to_vec()),
            Some(passphrase) => {
                let salt = kdf::generate_salt()?;
                let key = kdf::derive_key_blocking(passphrase, &salt, self.iterations).await?;
                let sealed = SealedPayload {
                    iterations: self.iterations,
                    salt: kdf::encode_salt(&salt),
                    envelope: crypto::seal(&key, &json)?,
                };
                SnapshotFile::new(PayloadMode::Sealed, serde_json::to_vec(&sealed)?)
            }
        };

        debug!(
            records = export.records.len(),
            mode = %file.mode,
            "snapshot created"
        );
        Ok(Snapshot {
            bytes: file.encode(),
            checksum: file.checksum.clone(),
            mode: file.mode,
        })
    }

    /// Check marker, payload mode and checksum. Needs no passphrase.
    pub fn verify(bytes: &[u8]) -> VerifyReport {
        match Self::check(bytes) {
            Ok(file) => VerifyReport {
                valid: true,
                mode: Some(file.mode),
                error: None,
            },
            Err(e) => VerifyReport {
                valid: false,
                mode: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn check(bytes: &[u8]) -> Result<SnapshotFile, KeywardError> {
        let file = SnapshotFile::parse(bytes)?;
        if !file.checksum_matches() {
            return Err(KeywardError::CorruptBackup("checksum mismatch".into()));
        }
        Ok(file)
    }

    /// Verify `bytes` and apply them to the store.
    ///
    /// Nothing is written unless verification and decoding succeed.
    pub async fn restore(
        &self,
        bytes: &[u8],
        mode: RestoreMode,
        passphrase: Option<&SecretString>,
    ) -> Result<RestoreReport, KeywardError> {
        let file = Self::check(bytes)?;
        let export = self.decode(&file, passphrase).await?;
        if export.format_version > EXPORT_FORMAT_VERSION {
            return Err(KeywardError::IncompatibleBackup(format!(
                "export format {} is newer than supported format {EXPORT_FORMAT_VERSION}",
                export.format_version
            )));
        }

        let report = match mode {
            RestoreMode::Overwrite => {
                self.store.replace_dataset(&export).await?;
                warn!(
                    records = export.records.len(),
                    "vault overwritten from backup"
                );
                RestoreReport::Overwrite {
                    records: export.records.len(),
                    categories: export.categories.len(),
                    tags: export.tags.len(),
                }
            }
            RestoreMode::Merge => self.merge(&export).await?,
        };
        Ok(report)
    }

    async fn merge(&self, export: &DatasetExport) -> Result<RestoreReport, KeywardError> {
        let local = self.store.load_meta().await?;
        let adopt_meta = match (&local, &export.meta) {
            (Some(local), Some(incoming)) if local.salt != incoming.salt => {
                return Err(KeywardError::IncompatibleBackup(
                    "backup records are sealed under a different master key".into(),
                ));
            }
            (None, Some(incoming)) => Some(incoming),
            _ => None,
        };
        let adopted_metadata = adopt_meta.is_some();

        let report = self.store.merge_dataset(export, adopt_meta).await?;
        info!(
            inserted = report.records_inserted,
            skipped = report.skipped_records.len(),
            adopted_metadata,
            "backup merged"
        );
        Ok(RestoreReport::Merge {
            report,
            adopted_metadata,
        })
    }

    async fn decode(
        &self,
        file: &SnapshotFile,
        passphrase: Option<&SecretString>,
    ) -> Result<DatasetExport, KeywardError> {
        let json = match file.mode {
            PayloadMode::Plain => Zeroizing::new(file.payload.clone()),
            PayloadMode::Sealed => {
                let passphrase = passphrase.ok_or(KeywardError::InvalidCredentials)?;
                let sealed: SealedPayload = serde_json::from_slice(&file.payload)
                    .map_err(|e| KeywardError::CorruptBackup(format!("sealed payload: {e}")))?;
                if !(self.min_iterations..=self.max_iterations).contains(&sealed.iterations) {
                    return Err(KeywardError::CorruptBackup(format!(
                        "sealed payload iteration count {} outside {}..={}",
                        sealed.iterations, self.min_iterations, self.max_iterations
                    )));
                }
                let salt = kdf::decode_salt(&sealed.salt)?;
                let key = kdf::derive_key_blocking(passphrase, &salt, sealed.iterations).await?;
                crypto::open(&key, &sealed.envelope)?
            }
        };
        serde_json::from_slice(&json)
            .map_err(|e| KeywardError::CorruptBackup(format!("dataset payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::MetaStore;
    use keyward_test_utils::{fast_security_config, MemoryStore};

    fn codec(store: Arc<MemoryStore>) -> BackupCodec {
        let config = BackupConfig {
            iterations: 1_000,
            ..BackupConfig::default()
        };
        BackupCodec::new(store, &config, &fast_security_config())
    }

    #[tokio::test]
    async fn empty_store_snapshot_is_valid() {
        let snapshot = codec(Arc::new(MemoryStore::new()))
            .create_snapshot(None)
            .await
            .unwrap();
        let report = BackupCodec::verify(&snapshot.bytes);
        assert!(report.valid, "{report:?}");
        assert_eq!(report.mode, Some(PayloadMode::Plain));
    }

    #[tokio::test]
    async fn sealed_snapshot_without_passphrase_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let codec = codec(store);
        let passphrase = SecretString::from("offsite".to_string());
        let snapshot = codec.create_snapshot(Some(&passphrase)).await.unwrap();

        let err = codec
            .restore(&snapshot.bytes, RestoreMode::Overwrite, None)
            .await
            .unwrap_err();
        assert!(matches!(err, KeywardError::InvalidCredentials));
    }

    #[tokio::test]
    async fn newer_export_format_is_incompatible() {
        let store = Arc::new(MemoryStore::new());
        let mut export = store.export_dataset().await.unwrap();
        export.format_version = EXPORT_FORMAT_VERSION + 1;
        let file = SnapshotFile::new(PayloadMode::Plain, serde_json::to_vec(&export).unwrap());

        let err = codec(store.clone())
            .restore(&file.encode(), RestoreMode::Overwrite, None)
            .await
            .unwrap_err();
        assert!(matches!(err, KeywardError::IncompatibleBackup(_)));
        assert!(store.load_meta().await.unwrap().is_none());
    }

    #[test]
    fn restore_report_serializes_with_mode_tag() {
        let report = RestoreReport::Overwrite {
            records: 2,
            categories: 3,
            tags: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "overwrite");
        assert_eq!(json["records"], 2);
    }
}
