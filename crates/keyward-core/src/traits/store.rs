// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte-storage collaborator traits.
//!
//! The engine treats storage as an opaque key/value surface: records are
//! sealed envelopes addressed by id, and the metadata is a single row.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::KeywardError;
use crate::types::{
    Category, DatasetExport, MergeReport, PurgeReport, StoredRecord, Tag, VaultMeta,
    EXPORT_FORMAT_VERSION,
};

/// Record storage addressed by id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches one record.
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, KeywardError>;

    /// Inserts or replaces a record.
    async fn put(&self, record: &StoredRecord) -> Result<(), KeywardError>;

    /// Deletes a record. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, KeywardError>;

    /// Lists every record id, sorted.
    async fn list_ids(&self) -> Result<Vec<String>, KeywardError>;

    /// Lists every record, sorted by id.
    async fn list_records(&self) -> Result<Vec<StoredRecord>, KeywardError>;
}

/// Single-row vault metadata storage.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn load_meta(&self) -> Result<Option<VaultMeta>, KeywardError>;

    async fn save_meta(&self, meta: &VaultMeta) -> Result<(), KeywardError>;

    /// Removes the metadata row. Only a full reset calls this.
    async fn delete_meta(&self) -> Result<(), KeywardError>;
}

/// Category and tag storage.
#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, KeywardError>;

    async fn put_category(&self, category: &Category) -> Result<(), KeywardError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, KeywardError>;

    async fn put_tag(&self, tag: &Tag) -> Result<(), KeywardError>;
}

/// Everything the vault engine needs from a store, plus the bulk operations
/// that must be atomic.
#[async_trait]
pub trait VaultStore: RecordStore + MetaStore + LabelStore {
    /// Swaps in re-sealed records and the new metadata in one step.
    ///
    /// Either every staged record and the metadata land, or nothing changes.
    async fn commit_rekey(
        &self,
        staged: Vec<StoredRecord>,
        meta: &VaultMeta,
    ) -> Result<(), KeywardError>;

    /// Deletes every record, every non-default category and every tag.
    async fn purge_content(&self) -> Result<PurgeReport, KeywardError>;

    /// Replaces records, categories, tags and metadata with `export`.
    async fn replace_dataset(&self, export: &DatasetExport) -> Result<(), KeywardError>;

    /// Inserts the records, categories and tags of `export` whose ids are
    /// not present yet.
    ///
    /// `adopt_meta`, when given, is saved in the same step, so a failed
    /// merge never leaves it installed. Otherwise metadata is untouched.
    async fn merge_dataset(
        &self,
        export: &DatasetExport,
        adopt_meta: Option<&VaultMeta>,
    ) -> Result<MergeReport, KeywardError>;

    /// Reads the full dataset.
    async fn export_dataset(&self) -> Result<DatasetExport, KeywardError> {
        Ok(DatasetExport {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: Utc::now(),
            meta: self.load_meta().await?,
            records: self.list_records().await?,
            categories: self.list_categories().await?,
            tags: self.list_tags().await?,
        })
    }
}
