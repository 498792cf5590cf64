// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle integration tests against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;

use keyward_core::{
    Credential, ExportReceipt, KeywardError, MetaStore, SafetyExporter, SecurityLevel, VaultMeta,
    VaultStatus,
};
use keyward_test_utils::harness::{FAST_CURRENT_ITERATIONS, FAST_LEGACY_ITERATIONS};
use keyward_test_utils::{fast_security_config, MemoryStore};
use keyward_vault::{
    crypto, kdf, ResetConfirmation, SecurityPolicy, SessionContext, Vault, RESET_PHRASE,
};

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn vault() -> (Vault, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let policy = SecurityPolicy::from_config(&fast_security_config());
    (Vault::new(store.clone(), policy), store)
}

async fn initialized(password: &str) -> (Vault, Arc<MemoryStore>, SessionContext) {
    let (vault, store) = vault();
    let mut session = SessionContext::new();
    vault.setup(&mut session, &secret(password)).await.unwrap();
    (vault, store, session)
}

#[derive(Default)]
struct CountingExporter {
    calls: AtomicUsize,
}

#[async_trait]
impl SafetyExporter for CountingExporter {
    async fn export_snapshot(&self) -> Result<ExportReceipt, KeywardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExportReceipt {
            location: "memory://safety".to_string(),
            checksum: "00".to_string(),
            size: 0,
        })
    }
}

#[tokio::test]
async fn setup_then_unlock_with_same_password() {
    let (vault, _store, mut session) = initialized("Tr0ub4dor&3").await;
    assert_eq!(vault.status(&session).await.unwrap(), VaultStatus::Unlocked);

    vault.lock(&mut session);
    assert_eq!(vault.status(&session).await.unwrap(), VaultStatus::Locked);

    let report = vault.unlock(&mut session, &secret("Tr0ub4dor&3")).await.unwrap();
    assert_eq!(report.iterations, FAST_CURRENT_ITERATIONS);
    assert!(!report.repaired_schema_version);
    assert!(session.is_unlocked());
}

#[tokio::test]
async fn unlock_with_wrong_password_fails() {
    let (vault, _store, mut session) = initialized("Tr0ub4dor&3").await;
    vault.lock(&mut session);

    let result = vault.unlock(&mut session, &secret("wrong")).await;
    assert!(matches!(result, Err(KeywardError::InvalidCredentials)));
    assert!(!session.is_unlocked());
}

#[tokio::test]
async fn setup_twice_is_rejected() {
    let (vault, _store, mut session) = initialized("first").await;
    let result = vault.setup(&mut session, &secret("second")).await;
    assert!(matches!(result, Err(KeywardError::AlreadyInitialized)));
}

#[tokio::test]
async fn operations_before_setup_report_not_initialized() {
    let (vault, _store) = vault();
    let mut session = SessionContext::new();
    assert_eq!(
        vault.status(&session).await.unwrap(),
        VaultStatus::Uninitialized
    );
    assert!(matches!(
        vault.unlock(&mut session, &secret("x")).await,
        Err(KeywardError::NotInitialized)
    ));
    assert!(matches!(
        vault.security_info().await,
        Err(KeywardError::NotInitialized)
    ));
}

#[tokio::test]
async fn new_vault_uses_current_schema() {
    let (vault, store, _session) = initialized("pw").await;
    let meta = store.load_meta().await.unwrap().unwrap();
    assert_eq!(meta.schema_version, 2);
    assert_eq!(meta.kdf_iterations, None);
    assert_eq!(kdf::decode_salt(&meta.salt).unwrap().len(), kdf::SALT_LEN);

    let info = vault.security_info().await.unwrap();
    assert_eq!(info.iterations, FAST_CURRENT_ITERATIONS);
    assert!(!info.needs_upgrade);
}

#[tokio::test]
async fn records_need_an_unlocked_session() {
    let (vault, _store, mut session) = initialized("pw").await;
    vault
        .put_record(&session, "bank", Some("login"), b"pin 0000")
        .await
        .unwrap();
    vault.lock(&mut session);

    assert!(matches!(
        vault.get_record(&session, "bank").await,
        Err(KeywardError::VaultLocked)
    ));
    assert!(matches!(
        vault.put_record(&session, "x", None, b"y").await,
        Err(KeywardError::VaultLocked)
    ));
    // The cleartext index stays readable.
    assert_eq!(vault.list_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn credentials_roundtrip_and_stay_sealed() {
    let (vault, store, session) = initialized("pw").await;
    let credential = Credential {
        title: "Mail".into(),
        username: Some("ada@example.com".into()),
        secret: "correct horse".into(),
        url: Some("https://mail.example.com".into()),
        notes: None,
        tags: vec!["personal".into()],
    };
    vault
        .put_credential(&session, "mail", Some("login"), &credential)
        .await
        .unwrap();

    let raw = store.raw_envelope("mail").await.unwrap();
    assert!(!raw.contains("correct horse"));
    assert!(!raw.contains("ada@example.com"));

    let back = vault.get_credential(&session, "mail").await.unwrap().unwrap();
    assert_eq!(back, credential);
    assert!(vault.get_credential(&session, "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let (vault, _store, session) = initialized("pw").await;
    let result = vault.put_record(&session, "x", Some("nope"), b"y").await;
    assert!(matches!(result, Err(KeywardError::NotFound(_))));

    let custom = vault.add_category("Work Stuff").await.unwrap();
    assert_eq!(custom.id, "work-stuff");
    vault
        .put_record(&session, "x", Some("work-stuff"), b"y")
        .await
        .unwrap();
}

#[tokio::test]
async fn overwrite_keeps_created_at() {
    let (vault, _store, session) = initialized("pw").await;
    vault.put_record(&session, "a", None, b"one").await.unwrap();
    let first = vault.list_records().await.unwrap()[0].clone();
    vault.put_record(&session, "a", None, b"two").await.unwrap();
    let second = vault.list_records().await.unwrap()[0].clone();

    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(
        vault.get_record(&session, "a").await.unwrap().unwrap().as_slice(),
        b"two"
    );
}

#[tokio::test]
async fn stale_schema_version_unlocks_and_is_repaired() {
    let (vault, store) = vault();
    let password = secret("Tr0ub4dor&3");

    // Metadata says schema 1, but the hash was computed at the current count.
    let salt = kdf::generate_salt().unwrap();
    let key = kdf::derive_key(b"Tr0ub4dor&3", &salt, FAST_CURRENT_ITERATIONS).unwrap();
    let now = Utc::now();
    store
        .save_meta(&VaultMeta {
            salt: kdf::encode_salt(&salt),
            verification_hash: kdf::verification_hash(&key),
            schema_version: 1,
            kdf_iterations: None,
            totp_enabled: false,
            totp_secret_encrypted: None,
            recovery_codes_encrypted: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let mut session = SessionContext::new();
    let report = vault.unlock(&mut session, &password).await.unwrap();
    assert!(report.repaired_schema_version);
    assert_eq!(report.iterations, FAST_CURRENT_ITERATIONS);

    let meta = store.load_meta().await.unwrap().unwrap();
    assert_eq!(meta.schema_version, 2);

    // Subsequent unlocks take the normal path.
    vault.lock(&mut session);
    let report = vault.unlock(&mut session, &password).await.unwrap();
    assert!(!report.repaired_schema_version);
}

#[tokio::test]
async fn wrong_password_on_legacy_vault_does_not_repair() {
    let (vault, store) = vault();
    let salt = kdf::generate_salt().unwrap();
    let key = kdf::derive_key(b"right", &salt, FAST_LEGACY_ITERATIONS).unwrap();
    let now = Utc::now();
    store
        .save_meta(&VaultMeta {
            salt: kdf::encode_salt(&salt),
            verification_hash: kdf::verification_hash(&key),
            schema_version: 1,
            kdf_iterations: None,
            totp_enabled: false,
            totp_secret_encrypted: None,
            recovery_codes_encrypted: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let mut session = SessionContext::new();
    assert!(matches!(
        vault.unlock(&mut session, &secret("wrong")).await,
        Err(KeywardError::InvalidCredentials)
    ));
    assert_eq!(store.load_meta().await.unwrap().unwrap().schema_version, 1);

    let report = vault.unlock(&mut session, &secret("right")).await.unwrap();
    assert_eq!(report.iterations, FAST_LEGACY_ITERATIONS);
    assert!(!report.repaired_schema_version);

    let info = vault.security_info().await.unwrap();
    assert!(info.needs_upgrade);
    assert_eq!(info.security_level, SecurityLevel::Low);
}

#[tokio::test]
async fn password_change_migrates_every_record() {
    let (vault, store, mut session) = initialized("old password").await;
    for i in 0..5 {
        vault
            .put_record(&session, &format!("rec-{i}"), None, format!("secret {i}").as_bytes())
            .await
            .unwrap();
    }
    let old_meta = store.load_meta().await.unwrap().unwrap();

    let report = vault
        .change_master_password(&mut session, &secret("old password"), &secret("new password"))
        .await
        .unwrap();
    assert_eq!(report.records_migrated, 5);

    // None of the new envelopes open under the old key.
    let old_key = kdf::derive_key(
        b"old password",
        &kdf::decode_salt(&old_meta.salt).unwrap(),
        FAST_CURRENT_ITERATIONS,
    )
    .unwrap();
    for i in 0..5 {
        let raw = store.raw_envelope(&format!("rec-{i}")).await.unwrap();
        let envelope = crypto::Envelope::from_json(&raw).unwrap();
        assert!(matches!(
            crypto::open(&old_key, &envelope),
            Err(KeywardError::AuthenticationFailed)
        ));
    }

    vault.lock(&mut session);
    assert!(matches!(
        vault.unlock(&mut session, &secret("old password")).await,
        Err(KeywardError::InvalidCredentials)
    ));
    vault
        .unlock(&mut session, &secret("new password"))
        .await
        .unwrap();
    for i in 0..5 {
        let plaintext = vault
            .get_record(&session, &format!("rec-{i}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plaintext.as_slice(), format!("secret {i}").as_bytes());
    }
}

#[tokio::test]
async fn password_change_with_wrong_old_password_changes_nothing() {
    let (vault, store, mut session) = initialized("pw").await;
    vault.put_record(&session, "a", None, b"x").await.unwrap();
    let before = store.raw_envelope("a").await.unwrap();

    let result = vault
        .change_master_password(&mut session, &secret("nope"), &secret("new"))
        .await;
    assert!(matches!(result, Err(KeywardError::InvalidCredentials)));
    assert_eq!(store.raw_envelope("a").await.unwrap(), before);
}

#[tokio::test]
async fn failed_commit_leaves_vault_on_old_password() {
    let (vault, store, mut session) = initialized("pw").await;
    vault.put_record(&session, "a", None, b"keep me").await.unwrap();
    let before = store.raw_envelope("a").await.unwrap();

    store.fail_next_commit();
    let result = vault
        .change_master_password(&mut session, &secret("pw"), &secret("other"))
        .await;
    assert!(matches!(result, Err(KeywardError::Storage { .. })));
    assert_eq!(store.raw_envelope("a").await.unwrap(), before);

    vault.lock(&mut session);
    vault.unlock(&mut session, &secret("pw")).await.unwrap();
    assert_eq!(
        vault.get_record(&session, "a").await.unwrap().unwrap().as_slice(),
        b"keep me"
    );
}

#[tokio::test]
async fn upgrade_moves_legacy_vault_to_current_schema() {
    let (vault, store) = vault();
    let mut session = SessionContext::new();
    vault.setup(&mut session, &secret("pw")).await.unwrap();
    vault.put_record(&session, "a", None, b"data").await.unwrap();
    vault
        .upgrade_security_params(&mut session, &secret("pw"), Some(FAST_LEGACY_ITERATIONS))
        .await
        .unwrap();
    assert_eq!(store.load_meta().await.unwrap().unwrap().schema_version, 1);
    assert!(vault.security_info().await.unwrap().needs_upgrade);

    let report = vault
        .upgrade_security_params(&mut session, &secret("pw"), None)
        .await
        .unwrap();
    assert_eq!(report.schema_version, 2);
    assert_eq!(report.iterations, FAST_CURRENT_ITERATIONS);
    assert_eq!(session.iterations(), Some(FAST_CURRENT_ITERATIONS));

    vault.lock(&mut session);
    vault.unlock(&mut session, &secret("pw")).await.unwrap();
    assert_eq!(
        vault.get_record(&session, "a").await.unwrap().unwrap().as_slice(),
        b"data"
    );
}

#[tokio::test]
async fn explicit_iteration_override_is_persisted_and_used() {
    let (vault, store, mut session) = initialized("pw").await;
    vault
        .upgrade_security_params(&mut session, &secret("pw"), Some(3_000))
        .await
        .unwrap();

    let meta = store.load_meta().await.unwrap().unwrap();
    assert_eq!(meta.schema_version, 2);
    assert_eq!(meta.kdf_iterations, Some(3_000));
    assert_eq!(vault.security_info().await.unwrap().iterations, 3_000);

    vault.lock(&mut session);
    let report = vault.unlock(&mut session, &secret("pw")).await.unwrap();
    assert_eq!(report.iterations, 3_000);
}

#[tokio::test]
async fn upgrade_outside_bounds_is_rejected() {
    let (vault, _store, mut session) = initialized("pw").await;
    let too_low = vault
        .upgrade_security_params(&mut session, &secret("pw"), Some(10))
        .await;
    assert!(matches!(too_low, Err(KeywardError::OutOfRange { value: 10, .. })));

    let too_high = vault
        .upgrade_security_params(&mut session, &secret("pw"), Some(1_000_000))
        .await;
    assert!(matches!(too_high, Err(KeywardError::OutOfRange { .. })));
}

#[tokio::test]
async fn destroy_exports_then_wipes_content() {
    let (vault, store, mut session) = initialized("pw").await;
    vault.add_category("Work").await.unwrap();
    vault.add_tag("urgent").await.unwrap();
    vault.put_record(&session, "a", Some("work"), b"x").await.unwrap();
    vault.put_record(&session, "b", None, b"y").await.unwrap();

    let exporter = CountingExporter::default();
    let report = vault
        .destroy(&mut session, &secret("pw"), &exporter)
        .await
        .unwrap();
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.purge.records_deleted, 2);
    assert_eq!(report.purge.categories_deleted, 1);
    assert_eq!(report.purge.tags_deleted, 1);

    assert!(!session.is_unlocked());
    assert_eq!(store.record_count().await, 0);
    let categories = vault.list_categories().await.unwrap();
    assert!(categories.iter().all(|c| c.is_default));
    assert_eq!(categories.len(), 3);

    // Metadata survives, so the same password still works.
    vault.unlock(&mut session, &secret("pw")).await.unwrap();
}

#[tokio::test]
async fn destroy_with_wrong_password_exports_nothing() {
    let (vault, store, mut session) = initialized("pw").await;
    vault.put_record(&session, "a", None, b"x").await.unwrap();

    let exporter = CountingExporter::default();
    let result = vault.destroy(&mut session, &secret("bad"), &exporter).await;
    assert!(matches!(result, Err(KeywardError::InvalidCredentials)));
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.record_count().await, 1);
}

#[tokio::test]
async fn reset_returns_vault_to_uninitialized() {
    let (vault, _store, mut session) = initialized("forgotten").await;
    vault.put_record(&session, "a", None, b"x").await.unwrap();

    let confirmation = ResetConfirmation::from_phrase(RESET_PHRASE).unwrap();
    let purge = vault.reset(&mut session, confirmation).await.unwrap();
    assert_eq!(purge.records_deleted, 1);
    assert_eq!(
        vault.status(&session).await.unwrap(),
        VaultStatus::Uninitialized
    );

    vault.setup(&mut session, &secret("fresh")).await.unwrap();
}

#[tokio::test]
async fn delete_record_reports_existence() {
    let (vault, _store, session) = initialized("pw").await;
    vault.put_record(&session, "a", None, b"x").await.unwrap();
    assert!(vault.delete_record(&session, "a").await.unwrap());
    assert!(!vault.delete_record(&session, "a").await.unwrap());
}
