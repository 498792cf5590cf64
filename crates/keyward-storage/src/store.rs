// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the vault store traits.
//!
//! Bulk operations (re-key commit, purge, replace, merge) each run in one
//! transaction on the writer thread.

use async_trait::async_trait;
use tracing::debug;

use keyward_config::model::StorageConfig;
use keyward_core::{
    Category, DatasetExport, KeywardError, LabelStore, MergeReport, MetaStore, PurgeReport,
    RecordStore, StoredRecord, Tag, VaultMeta, VaultStore,
};

use crate::database::{map_tr_err, Database};
use crate::queries::{labels, meta, records};

/// SQLite-backed vault store.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database named by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, KeywardError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub async fn open_in_memory() -> Result<Self, KeywardError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), KeywardError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, KeywardError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| records::get_record(conn, &id))
            .await
            .map_err(map_tr_err)
    }

    async fn put(&self, record: &StoredRecord) -> Result<(), KeywardError> {
        let record = record.clone();
        self.db
            .connection()
            .call(move |conn| records::upsert_record(conn, &record))
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, id: &str) -> Result<bool, KeywardError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| records::delete_record(conn, &id))
            .await
            .map_err(map_tr_err)
    }

    async fn list_ids(&self) -> Result<Vec<String>, KeywardError> {
        self.db
            .connection()
            .call(|conn| records::list_record_ids(conn))
            .await
            .map_err(map_tr_err)
    }

    async fn list_records(&self) -> Result<Vec<StoredRecord>, KeywardError> {
        self.db
            .connection()
            .call(|conn| records::list_records(conn))
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl MetaStore for SqliteStore {
    async fn load_meta(&self) -> Result<Option<VaultMeta>, KeywardError> {
        self.db
            .connection()
            .call(|conn| meta::load_meta(conn))
            .await
            .map_err(map_tr_err)
    }

    async fn save_meta(&self, vault_meta: &VaultMeta) -> Result<(), KeywardError> {
        let vault_meta = vault_meta.clone();
        self.db
            .connection()
            .call(move |conn| meta::save_meta(conn, &vault_meta))
            .await
            .map_err(map_tr_err)
    }

    async fn delete_meta(&self) -> Result<(), KeywardError> {
        self.db
            .connection()
            .call(|conn| meta::delete_meta(conn))
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl LabelStore for SqliteStore {
    async fn list_categories(&self) -> Result<Vec<Category>, KeywardError> {
        self.db
            .connection()
            .call(|conn| labels::list_categories(conn))
            .await
            .map_err(map_tr_err)
    }

    async fn put_category(&self, category: &Category) -> Result<(), KeywardError> {
        let category = category.clone();
        self.db
            .connection()
            .call(move |conn| labels::upsert_category(conn, &category))
            .await
            .map_err(map_tr_err)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, KeywardError> {
        self.db
            .connection()
            .call(|conn| labels::list_tags(conn))
            .await
            .map_err(map_tr_err)
    }

    async fn put_tag(&self, tag: &Tag) -> Result<(), KeywardError> {
        let tag = tag.clone();
        self.db
            .connection()
            .call(move |conn| labels::upsert_tag(conn, &tag))
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl VaultStore for SqliteStore {
    async fn commit_rekey(
        &self,
        staged: Vec<StoredRecord>,
        vault_meta: &VaultMeta,
    ) -> Result<(), KeywardError> {
        let vault_meta = vault_meta.clone();
        let count = staged.len();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                for record in &staged {
                    records::upsert_record(&tx, record)?;
                }
                meta::save_meta(&tx, &vault_meta)?;
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(records = count, "re-key committed");
        Ok(())
    }

    async fn purge_content(&self) -> Result<PurgeReport, KeywardError> {
        self.db
            .connection()
            .call(|conn| -> Result<PurgeReport, rusqlite::Error> {
                let tx = conn.transaction()?;
                let report = PurgeReport {
                    records_deleted: records::delete_all_records(&tx)?,
                    categories_deleted: labels::delete_custom_categories(&tx)?,
                    tags_deleted: labels::delete_all_tags(&tx)?,
                };
                tx.commit()?;
                Ok(report)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn replace_dataset(&self, export: &DatasetExport) -> Result<(), KeywardError> {
        let export = export.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                records::delete_all_records(&tx)?;
                labels::delete_all_tags(&tx)?;
                labels::delete_all_categories(&tx)?;
                meta::delete_meta(&tx)?;

                for category in &export.categories {
                    labels::upsert_category(&tx, category)?;
                }
                for tag in &export.tags {
                    labels::upsert_tag(&tx, tag)?;
                }
                for record in &export.records {
                    records::upsert_record(&tx, record)?;
                }
                if let Some(vault_meta) = &export.meta {
                    meta::save_meta(&tx, vault_meta)?;
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn merge_dataset(
        &self,
        export: &DatasetExport,
        adopt_meta: Option<&VaultMeta>,
    ) -> Result<MergeReport, KeywardError> {
        let export = export.clone();
        let adopt_meta = adopt_meta.cloned();
        self.db
            .connection()
            .call(move |conn| -> Result<MergeReport, rusqlite::Error> {
                let tx = conn.transaction()?;
                let mut report = MergeReport::default();

                for category in &export.categories {
                    if labels::insert_category_if_absent(&tx, category)? {
                        report.categories_inserted += 1;
                    } else {
                        report.skipped_categories.push(category.id.clone());
                    }
                }
                for tag in &export.tags {
                    if labels::insert_tag_if_absent(&tx, tag)? {
                        report.tags_inserted += 1;
                    } else {
                        report.skipped_tags.push(tag.id.clone());
                    }
                }
                for record in &export.records {
                    if records::insert_record_if_absent(&tx, record)? {
                        report.records_inserted += 1;
                    } else {
                        report.skipped_records.push(record.id.clone());
                    }
                }
                if let Some(vault_meta) = &adopt_meta {
                    meta::save_meta(&tx, vault_meta)?;
                }

                tx.commit()?;
                Ok(report)
            })
            .await
            .map_err(map_tr_err)
    }
}
