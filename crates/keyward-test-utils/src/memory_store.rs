// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `VaultStore` for deterministic testing.
//!
//! All state sits behind one mutex, so every bulk operation is trivially
//! atomic. `fail_next_commit()` makes the next `commit_rekey` fail without
//! touching state, which lets tests check that a failed re-key leaves the
//! vault readable with the old password.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use keyward_core::{
    Category, DatasetExport, KeywardError, LabelStore, MergeReport, MetaStore, PurgeReport,
    RecordStore, StoredRecord, Tag, VaultMeta, VaultStore, DEFAULT_CATEGORIES,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    meta: Option<VaultMeta>,
    records: BTreeMap<String, StoredRecord>,
    categories: BTreeMap<String, Category>,
    tags: BTreeMap<String, Tag>,
}

/// A `VaultStore` that keeps everything in process memory.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    /// An empty store seeded with the default categories.
    pub fn new() -> Self {
        let now = Utc::now();
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|(id, name)| {
                (
                    id.to_string(),
                    Category {
                        id: id.to_string(),
                        name: name.to_string(),
                        is_default: true,
                        created_at: now,
                    },
                )
            })
            .collect();
        Self {
            state: Mutex::new(MemoryState {
                categories,
                ..MemoryState::default()
            }),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Make the next `commit_rekey` fail with a storage error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Raw envelope JSON of a record, for assertions on ciphertext.
    pub async fn raw_envelope(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .records
            .get(id)
            .map(|r| r.envelope.clone())
    }

    pub async fn record_count(&self) -> usize {
        self.state.lock().await.records.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, KeywardError> {
        Ok(self.state.lock().await.records.get(id).cloned())
    }

    async fn put(&self, record: &StoredRecord) -> Result<(), KeywardError> {
        self.state
            .lock()
            .await
            .records
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, KeywardError> {
        Ok(self.state.lock().await.records.remove(id).is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>, KeywardError> {
        Ok(self.state.lock().await.records.keys().cloned().collect())
    }

    async fn list_records(&self) -> Result<Vec<StoredRecord>, KeywardError> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn load_meta(&self) -> Result<Option<VaultMeta>, KeywardError> {
        Ok(self.state.lock().await.meta.clone())
    }

    async fn save_meta(&self, meta: &VaultMeta) -> Result<(), KeywardError> {
        self.state.lock().await.meta = Some(meta.clone());
        Ok(())
    }

    async fn delete_meta(&self) -> Result<(), KeywardError> {
        self.state.lock().await.meta = None;
        Ok(())
    }
}

#[async_trait]
impl LabelStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, KeywardError> {
        Ok(self.state.lock().await.categories.values().cloned().collect())
    }

    async fn put_category(&self, category: &Category) -> Result<(), KeywardError> {
        self.state
            .lock()
            .await
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, KeywardError> {
        Ok(self.state.lock().await.tags.values().cloned().collect())
    }

    async fn put_tag(&self, tag: &Tag) -> Result<(), KeywardError> {
        self.state
            .lock()
            .await
            .tags
            .insert(tag.id.clone(), tag.clone());
        Ok(())
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn commit_rekey(
        &self,
        staged: Vec<StoredRecord>,
        meta: &VaultMeta,
    ) -> Result<(), KeywardError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(KeywardError::storage(std::io::Error::other(
                "injected commit failure",
            )));
        }
        let mut state = self.state.lock().await;
        for record in staged {
            state.records.insert(record.id.clone(), record);
        }
        state.meta = Some(meta.clone());
        Ok(())
    }

    async fn purge_content(&self) -> Result<PurgeReport, KeywardError> {
        let mut state = self.state.lock().await;
        let records_deleted = state.records.len();
        let tags_deleted = state.tags.len();
        state.records.clear();
        state.tags.clear();
        let before = state.categories.len();
        state.categories.retain(|_, c| c.is_default);
        Ok(PurgeReport {
            records_deleted,
            categories_deleted: before - state.categories.len(),
            tags_deleted,
        })
    }

    async fn replace_dataset(&self, export: &DatasetExport) -> Result<(), KeywardError> {
        let mut state = self.state.lock().await;
        *state = MemoryState {
            meta: export.meta.clone(),
            records: export
                .records
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            categories: export
                .categories
                .iter()
                .map(|c| (c.id.clone(), c.clone()))
                .collect(),
            tags: export.tags.iter().map(|t| (t.id.clone(), t.clone())).collect(),
        };
        Ok(())
    }

    async fn merge_dataset(
        &self,
        export: &DatasetExport,
        adopt_meta: Option<&VaultMeta>,
    ) -> Result<MergeReport, KeywardError> {
        let mut state = self.state.lock().await;
        let mut report = MergeReport::default();

        for record in &export.records {
            if state.records.contains_key(&record.id) {
                report.skipped_records.push(record.id.clone());
            } else {
                state.records.insert(record.id.clone(), record.clone());
                report.records_inserted += 1;
            }
        }
        for category in &export.categories {
            if state.categories.contains_key(&category.id) {
                report.skipped_categories.push(category.id.clone());
            } else {
                state.categories.insert(category.id.clone(), category.clone());
                report.categories_inserted += 1;
            }
        }
        for tag in &export.tags {
            if state.tags.contains_key(&tag.id) {
                report.skipped_tags.push(tag.id.clone());
            } else {
                state.tags.insert(tag.id.clone(), tag.clone());
                report.tags_inserted += 1;
            }
        }
        if let Some(meta) = adopt_meta {
            state.meta = Some(meta.clone());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> StoredRecord {
        let now = Utc::now();
        StoredRecord {
            id: id.to_string(),
            category: None,
            envelope: format!("envelope-{id}"),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn starts_with_default_categories() {
        let store = MemoryStore::new();
        let ids: Vec<_> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["card", "login", "note"]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.put(&record("a")).await.unwrap();
        store.fail_next_commit();

        let mut changed = record("a");
        changed.envelope = "changed".into();
        let meta = VaultMeta {
            salt: "s".into(),
            verification_hash: "h".into(),
            schema_version: 2,
            kdf_iterations: None,
            totp_enabled: false,
            totp_secret_encrypted: None,
            recovery_codes_encrypted: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(store.commit_rekey(vec![changed.clone()], &meta).await.is_err());
        assert_eq!(store.raw_envelope("a").await.unwrap(), "envelope-a");
        assert!(store.load_meta().await.unwrap().is_none());

        // Only the next commit fails.
        store.commit_rekey(vec![changed], &meta).await.unwrap();
        assert_eq!(store.raw_envelope("a").await.unwrap(), "changed");
    }

    #[tokio::test]
    async fn merge_skips_existing_ids() {
        let store = MemoryStore::new();
        store.put(&record("a")).await.unwrap();
        let mut export = store.export_dataset().await.unwrap();
        export.records.push(record("b"));

        let report = store.merge_dataset(&export, None).await.unwrap();
        assert_eq!(report.records_inserted, 1);
        assert_eq!(report.skipped_records, vec!["a".to_string()]);
        assert_eq!(report.skipped_categories.len(), 3);
        assert_eq!(store.record_count().await, 2);
    }
}
