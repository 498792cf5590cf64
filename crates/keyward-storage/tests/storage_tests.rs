// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed SQLite store tests, including a full vault round trip.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::SecretString;

use keyward_config::model::StorageConfig;
use keyward_core::{
    Category, Credential, DatasetExport, LabelStore, MetaStore, RecordStore, StoredRecord, Tag,
    VaultMeta, VaultStore, EXPORT_FORMAT_VERSION,
};
use keyward_storage::SqliteStore;
use keyward_test_utils::{fast_security_config, TestDirs};
use keyward_vault::{SecurityPolicy, SessionContext, Vault};

fn storage_config(dirs: &TestDirs) -> StorageConfig {
    StorageConfig {
        database_path: dirs.database_path().to_string_lossy().into_owned(),
        wal_mode: true,
    }
}

fn meta(salt: &str) -> VaultMeta {
    let created_at = Utc::now() - Duration::days(3);
    VaultMeta {
        salt: salt.to_string(),
        verification_hash: "aGFzaA==".to_string(),
        schema_version: 1,
        kdf_iterations: Some(3_000),
        totp_enabled: true,
        totp_secret_encrypted: Some("{\"totp\":1}".to_string()),
        recovery_codes_encrypted: None,
        created_at,
        updated_at: Utc::now(),
    }
}

fn record(id: &str, envelope: &str) -> StoredRecord {
    let now = Utc::now();
    StoredRecord {
        id: id.to_string(),
        category: Some("login".to_string()),
        envelope: envelope.to_string(),
        created_at: now - Duration::hours(1),
        updated_at: now,
    }
}

#[tokio::test]
async fn open_creates_parent_directory_and_schema() {
    let dirs = TestDirs::new().unwrap();
    let mut config = storage_config(&dirs);
    config.database_path = dirs
        .root()
        .join("nested")
        .join("vault.db")
        .to_string_lossy()
        .into_owned();

    let store = SqliteStore::open(&config).await.unwrap();
    assert!(dirs.root().join("nested").join("vault.db").exists());
    assert!(store.load_meta().await.unwrap().is_none());
    assert_eq!(store.list_categories().await.unwrap().len(), 3);
}

#[tokio::test]
async fn meta_round_trips_every_field() {
    let dirs = TestDirs::new().unwrap();
    let store = SqliteStore::open(&storage_config(&dirs)).await.unwrap();

    let stored = meta("c2FsdA==");
    store.save_meta(&stored).await.unwrap();
    assert_eq!(store.load_meta().await.unwrap(), Some(stored.clone()));

    let mut updated = stored;
    updated.totp_enabled = false;
    updated.totp_secret_encrypted = None;
    updated.kdf_iterations = None;
    store.save_meta(&updated).await.unwrap();
    assert_eq!(store.load_meta().await.unwrap(), Some(updated));

    store.delete_meta().await.unwrap();
    assert!(store.load_meta().await.unwrap().is_none());
}

#[tokio::test]
async fn data_survives_reopen() {
    let dirs = TestDirs::new().unwrap();
    let config = storage_config(&dirs);
    {
        let store = SqliteStore::open(&config).await.unwrap();
        store.save_meta(&meta("c2FsdA==")).await.unwrap();
        store.put(&record("mail", "{}")).await.unwrap();
        store.close().await.unwrap();
    }

    let store = SqliteStore::open(&config).await.unwrap();
    assert!(store.load_meta().await.unwrap().is_some());
    assert_eq!(store.list_ids().await.unwrap(), vec!["mail".to_string()]);
}

#[tokio::test]
async fn commit_rekey_writes_records_and_meta_together() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.save_meta(&meta("b2xk")).await.unwrap();
    store.put(&record("a", "old-a")).await.unwrap();
    store.put(&record("b", "old-b")).await.unwrap();

    let staged = vec![record("a", "new-a"), record("b", "new-b")];
    store.commit_rekey(staged, &meta("bmV3")).await.unwrap();

    assert_eq!(store.get("a").await.unwrap().unwrap().envelope, "new-a");
    assert_eq!(store.get("b").await.unwrap().unwrap().envelope, "new-b");
    assert_eq!(store.load_meta().await.unwrap().unwrap().salt, "bmV3");
}

#[tokio::test]
async fn failed_commit_rekey_leaves_nothing_behind() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.save_meta(&meta("b2xk")).await.unwrap();
    store.put(&record("a", "old-a")).await.unwrap();

    let mut broken = record("b", "new-b");
    broken.category = Some("no-such-category".to_string());
    let result = store
        .commit_rekey(vec![record("a", "new-a"), broken], &meta("bmV3"))
        .await;

    assert!(result.is_err());
    assert_eq!(store.get("a").await.unwrap().unwrap().envelope, "old-a");
    assert!(store.get("b").await.unwrap().is_none());
    assert_eq!(store.load_meta().await.unwrap().unwrap().salt, "b2xk");
}

#[tokio::test]
async fn replace_dataset_is_exact() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.save_meta(&meta("bG9jYWw=")).await.unwrap();
    store.put(&record("local-only", "{}")).await.unwrap();

    let now = Utc::now();
    let export = DatasetExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: now,
        meta: Some(meta("c25hcA==")),
        records: vec![StoredRecord {
            category: Some("work".to_string()),
            ..record("from-backup", "{}")
        }],
        categories: vec![Category {
            id: "work".to_string(),
            name: "Work".to_string(),
            is_default: false,
            created_at: now,
        }],
        tags: vec![Tag {
            id: "shared".to_string(),
            name: "Shared".to_string(),
            created_at: now,
        }],
    };
    store.replace_dataset(&export).await.unwrap();

    let after = store.export_dataset().await.unwrap();
    assert_eq!(after.meta, export.meta);
    assert_eq!(after.records, export.records);
    assert_eq!(after.categories, export.categories);
    assert_eq!(after.tags, export.tags);
}

#[tokio::test]
async fn merge_dataset_skips_existing_ids() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.save_meta(&meta("bG9jYWw=")).await.unwrap();
    store.put(&record("shared", "local")).await.unwrap();

    let export = DatasetExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: Utc::now(),
        meta: Some(meta("c25hcA==")),
        records: vec![record("shared", "incoming"), record("new", "incoming")],
        categories: store.list_categories().await.unwrap(),
        tags: Vec::new(),
    };
    let report = store.merge_dataset(&export, None).await.unwrap();

    assert_eq!(report.records_inserted, 1);
    assert_eq!(report.skipped_records, vec!["shared".to_string()]);
    assert_eq!(report.categories_inserted, 0);
    assert_eq!(report.skipped_categories.len(), 3);
    assert_eq!(store.get("shared").await.unwrap().unwrap().envelope, "local");
    assert_eq!(store.get("new").await.unwrap().unwrap().envelope, "incoming");
    assert_eq!(store.load_meta().await.unwrap().unwrap().salt, "bG9jYWw=");
}

#[tokio::test]
async fn merge_dataset_adopts_metadata_with_the_records() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let incoming = meta("c25hcA==");
    let export = DatasetExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: Utc::now(),
        meta: Some(incoming.clone()),
        records: vec![record("new", "incoming")],
        categories: Vec::new(),
        tags: Vec::new(),
    };
    store.merge_dataset(&export, Some(&incoming)).await.unwrap();

    assert_eq!(store.load_meta().await.unwrap(), Some(incoming));
    assert!(store.get("new").await.unwrap().is_some());
}

#[tokio::test]
async fn failed_merge_does_not_adopt_metadata() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let incoming = meta("c25hcA==");
    let mut orphan = record("orphan", "incoming");
    orphan.category = Some("no-such-category".to_string());
    let export = DatasetExport {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: Utc::now(),
        meta: Some(incoming.clone()),
        records: vec![record("fine", "incoming"), orphan],
        categories: Vec::new(),
        tags: Vec::new(),
    };

    assert!(store.merge_dataset(&export, Some(&incoming)).await.is_err());
    assert!(store.load_meta().await.unwrap().is_none());
    assert!(store.get("fine").await.unwrap().is_none());
}

#[tokio::test]
async fn vault_runs_end_to_end_on_sqlite() {
    let dirs = TestDirs::new().unwrap();
    let config = storage_config(&dirs);
    let policy = SecurityPolicy::from_config(&fast_security_config());
    let password = SecretString::from("Tr0ub4dor&3".to_string());
    let new_password = SecretString::from("correct horse battery staple".to_string());

    {
        let store = Arc::new(SqliteStore::open(&config).await.unwrap());
        let vault = Vault::new(store.clone(), policy);
        let mut session = SessionContext::new();
        vault.setup(&mut session, &password).await.unwrap();
        vault
            .put_credential(
                &session,
                "mail",
                Some("login"),
                &Credential {
                    title: "Mail".to_string(),
                    username: Some("ada".to_string()),
                    secret: "hunter2".to_string(),
                    url: None,
                    notes: None,
                    tags: Vec::new(),
                },
            )
            .await
            .unwrap();
        vault
            .change_master_password(&mut session, &password, &new_password)
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&config).await.unwrap());
    let vault = Vault::new(store, policy);
    let mut session = SessionContext::new();
    assert!(vault.unlock(&mut session, &password).await.is_err());
    vault.unlock(&mut session, &new_password).await.unwrap();

    let credential = vault.get_credential(&session, "mail").await.unwrap().unwrap();
    assert_eq!(credential.secret, "hunter2");
    assert_eq!(credential.username.as_deref(), Some("ada"));
}
