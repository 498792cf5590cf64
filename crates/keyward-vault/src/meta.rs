// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-record vault metadata on top of the byte store.

use std::sync::Arc;

use chrono::Utc;
use keyward_core::{KeywardError, MetaStore, VaultMeta, VaultStore};

/// Reads and writes the vault metadata row.
#[derive(Clone)]
pub struct VaultMetadataStore {
    store: Arc<dyn VaultStore>,
}

impl VaultMetadataStore {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<VaultMeta>, KeywardError> {
        self.store.load_meta().await
    }

    /// Loads the metadata or fails with [`KeywardError::NotInitialized`].
    pub async fn require(&self) -> Result<VaultMeta, KeywardError> {
        self.store
            .load_meta()
            .await?
            .ok_or(KeywardError::NotInitialized)
    }

    pub async fn exists(&self) -> Result<bool, KeywardError> {
        Ok(self.store.load_meta().await?.is_some())
    }

    /// Writes a fresh metadata record. Fails if one already exists.
    pub async fn create(
        &self,
        salt: String,
        verification_hash: String,
        schema_version: u32,
        kdf_iterations: Option<u32>,
    ) -> Result<VaultMeta, KeywardError> {
        if self.exists().await? {
            return Err(KeywardError::AlreadyInitialized);
        }
        let now = Utc::now();
        let meta = VaultMeta {
            salt,
            verification_hash,
            schema_version,
            kdf_iterations,
            totp_enabled: false,
            totp_secret_encrypted: None,
            recovery_codes_encrypted: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save_meta(&meta).await?;
        Ok(meta)
    }

    /// Persists `meta`, stamping `updated_at`.
    pub async fn save(&self, meta: &mut VaultMeta) -> Result<(), KeywardError> {
        meta.updated_at = Utc::now();
        self.store.save_meta(meta).await
    }

    pub async fn delete(&self) -> Result<(), KeywardError> {
        self.store.delete_meta().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_test_utils::MemoryStore;

    #[tokio::test]
    async fn create_then_require() {
        let metadata = VaultMetadataStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            metadata.require().await,
            Err(KeywardError::NotInitialized)
        ));

        let created = metadata
            .create("c2FsdA==".into(), "aGFzaA==".into(), 2, None)
            .await
            .unwrap();
        let loaded = metadata.require().await.unwrap();
        assert_eq!(loaded.salt, created.salt);
        assert_eq!(loaded.schema_version, 2);
        assert!(!loaded.totp_enabled);
    }

    #[tokio::test]
    async fn second_create_is_rejected() {
        let metadata = VaultMetadataStore::new(Arc::new(MemoryStore::new()));
        metadata.create("a".into(), "b".into(), 2, None).await.unwrap();
        assert!(matches!(
            metadata.create("c".into(), "d".into(), 2, None).await,
            Err(KeywardError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn save_stamps_updated_at() {
        let metadata = VaultMetadataStore::new(Arc::new(MemoryStore::new()));
        let mut meta = metadata.create("a".into(), "b".into(), 1, None).await.unwrap();
        let before = meta.updated_at;
        meta.schema_version = 2;
        metadata.save(&mut meta).await.unwrap();
        let loaded = metadata.require().await.unwrap();
        assert_eq!(loaded.schema_version, 2);
        assert!(loaded.updated_at >= before);
    }
}
