// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault lifecycle: setup, unlock, lock, re-keying and destruction.
//!
//! Re-keying (password change and iteration upgrade) never writes a record
//! under the new key until every record has been re-sealed. The staged
//! records and the new metadata are handed to the store in one
//! `commit_rekey` call, so an interrupted re-key leaves the vault exactly as
//! it was.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keyward_core::{
    ExportReceipt, KeywardError, PurgeReport, RecordStore, SafetyExporter, SecurityInfo,
    StoredRecord, VaultMeta, VaultStatus, VaultStore,
};

use crate::crypto::{self, Envelope, KEY_LEN};
use crate::kdf;
use crate::meta::VaultMetadataStore;
use crate::policy::{SecurityPolicy, CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};
use crate::session::{SessionContext, SessionKey};

/// Phrase a caller must type to build a [`ResetConfirmation`].
pub const RESET_PHRASE: &str = "RESET VAULT";

/// Proof that a human confirmed a full reset.
///
/// Only constructible from the exact [`RESET_PHRASE`], so `reset` cannot be
/// wired to a code path that skipped the confirmation prompt.
#[derive(Debug)]
pub struct ResetConfirmation {
    _confirmed: (),
}

impl ResetConfirmation {
    pub fn from_phrase(phrase: &str) -> Result<Self, KeywardError> {
        if phrase.trim() == RESET_PHRASE {
            Ok(Self { _confirmed: () })
        } else {
            Err(KeywardError::InvalidCredentials)
        }
    }
}

/// Result of a successful unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnlockReport {
    pub iterations: u32,
    /// The stored schema version was stale and has been rewritten.
    pub repaired_schema_version: bool,
}

/// Result of a password change or iteration upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RekeyReport {
    pub records_migrated: usize,
    pub iterations: u32,
    pub schema_version: u32,
}

/// Result of `destroy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestroyReport {
    pub export: ExportReceipt,
    pub purge: PurgeReport,
}

/// The vault engine.
///
/// Holds no key material itself; every key-dependent call takes the
/// caller's [`SessionContext`].
#[derive(Clone)]
pub struct Vault {
    pub(crate) store: Arc<dyn VaultStore>,
    pub(crate) metadata: VaultMetadataStore,
    pub(crate) policy: SecurityPolicy,
}

impl Vault {
    pub fn new(store: Arc<dyn VaultStore>, policy: SecurityPolicy) -> Self {
        Self {
            metadata: VaultMetadataStore::new(store.clone()),
            store,
            policy,
        }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn VaultStore> {
        &self.store
    }

    pub fn metadata(&self) -> &VaultMetadataStore {
        &self.metadata
    }

    pub async fn is_initialized(&self) -> Result<bool, KeywardError> {
        self.metadata.exists().await
    }

    pub async fn status(&self, session: &SessionContext) -> Result<VaultStatus, KeywardError> {
        if !self.is_initialized().await? {
            return Ok(VaultStatus::Uninitialized);
        }
        Ok(if session.is_unlocked() {
            VaultStatus::Unlocked
        } else {
            VaultStatus::Locked
        })
    }

    pub async fn security_info(&self) -> Result<SecurityInfo, KeywardError> {
        let meta = self.metadata.require().await?;
        Ok(self.policy.security_info(&meta))
    }

    /// Create the vault and unlock it.
    pub async fn setup(
        &self,
        session: &mut SessionContext,
        password: &SecretString,
    ) -> Result<(), KeywardError> {
        if self.is_initialized().await? {
            return Err(KeywardError::AlreadyInitialized);
        }

        let iterations = self.policy.current_iterations;
        let salt = kdf::generate_salt()?;
        let key = kdf::derive_key_blocking(password, &salt, iterations).await?;

        self.metadata
            .create(
                kdf::encode_salt(&salt),
                kdf::verification_hash(&key),
                CURRENT_SCHEMA_VERSION,
                None,
            )
            .await?;
        session.set(SessionKey::new(key, iterations));

        info!(iterations, "vault initialized");
        Ok(())
    }

    /// Verify `password` and install the session key.
    ///
    /// A vault still marked schema version 1 whose hash only matches at the
    /// current iteration count is unlocked anyway and its schema version is
    /// rewritten. No other count is ever tried.
    pub async fn unlock(
        &self,
        session: &mut SessionContext,
        password: &SecretString,
    ) -> Result<UnlockReport, KeywardError> {
        let meta = self.metadata.require().await?;
        let salt = kdf::decode_salt(&meta.salt)?;
        let iterations = self.policy.resolve_iterations(&meta);

        if let Some(key) =
            kdf::derive_and_verify(password, &salt, &meta.verification_hash, iterations).await?
        {
            session.set(SessionKey::new(key, iterations));
            debug!(iterations, "vault unlocked");
            return Ok(UnlockReport {
                iterations,
                repaired_schema_version: false,
            });
        }

        let current = self.policy.current_iterations;
        if meta.schema_version == LEGACY_SCHEMA_VERSION && iterations != current {
            if let Some(key) =
                kdf::derive_and_verify(password, &salt, &meta.verification_hash, current).await?
            {
                warn!(
                    recorded_schema_version = meta.schema_version,
                    iterations = current,
                    "vault metadata out of date with its key derivation, repairing schema version"
                );
                let mut repaired = meta;
                repaired.schema_version = CURRENT_SCHEMA_VERSION;
                repaired.kdf_iterations = None;
                self.metadata.save(&mut repaired).await?;

                session.set(SessionKey::new(key, current));
                return Ok(UnlockReport {
                    iterations: current,
                    repaired_schema_version: true,
                });
            }
        }

        debug!("unlock rejected");
        Err(KeywardError::InvalidCredentials)
    }

    /// Zero and drop the session key. Idempotent.
    pub fn lock(&self, session: &mut SessionContext) {
        session.clear();
        debug!("vault locked");
    }

    /// Re-key the vault under a new password.
    ///
    /// Keeps the vault's iteration count unless it is below the current
    /// policy, in which case the change also upgrades it.
    pub async fn change_master_password(
        &self,
        session: &mut SessionContext,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<RekeyReport, KeywardError> {
        let meta = self.metadata.require().await?;
        let target = self
            .policy
            .resolve_iterations(&meta)
            .max(self.policy.current_iterations);
        let report = self
            .rekey(session, meta, old_password, new_password, target)
            .await?;
        info!(
            records = report.records_migrated,
            iterations = report.iterations,
            "master password changed"
        );
        Ok(report)
    }

    /// Re-key the vault under the same password with a new iteration count.
    ///
    /// `None` means the current policy count. Explicit counts must lie within
    /// the policy bounds.
    pub async fn upgrade_security_params(
        &self,
        session: &mut SessionContext,
        password: &SecretString,
        new_iterations: Option<u32>,
    ) -> Result<RekeyReport, KeywardError> {
        let target = match new_iterations {
            Some(n) => self.policy.check_range(n)?,
            None => self.policy.current_iterations,
        };
        let meta = self.metadata.require().await?;
        let report = self.rekey(session, meta, password, password, target).await?;
        info!(
            records = report.records_migrated,
            iterations = report.iterations,
            schema_version = report.schema_version,
            "security parameters upgraded"
        );
        Ok(report)
    }

    async fn rekey(
        &self,
        session: &mut SessionContext,
        meta: VaultMeta,
        current_password: &SecretString,
        new_password: &SecretString,
        target_iterations: u32,
    ) -> Result<RekeyReport, KeywardError> {
        let salt = kdf::decode_salt(&meta.salt)?;
        let iterations = self.policy.resolve_iterations(&meta);
        let old_key = kdf::derive_and_verify(
            current_password,
            &salt,
            &meta.verification_hash,
            iterations,
        )
        .await?
        .ok_or(KeywardError::InvalidCredentials)?;
        session.set(SessionKey::new(old_key, iterations));

        let new_salt = kdf::generate_salt()?;
        let new_key = kdf::derive_key_blocking(new_password, &new_salt, target_iterations).await?;

        let old_key = session.get()?.bytes();
        let mut staged = BTreeMap::new();
        for id in self.store.list_ids().await? {
            let Some(record) = self.store.get(&id).await? else {
                continue;
            };
            let envelope = reseal(old_key, &new_key, &record.envelope)?;
            staged.insert(
                id,
                StoredRecord {
                    envelope,
                    updated_at: Utc::now(),
                    ..record
                },
            );
        }

        let (schema_version, kdf_iterations) = self.policy.schema_for(target_iterations);
        let new_meta = VaultMeta {
            salt: kdf::encode_salt(&new_salt),
            verification_hash: kdf::verification_hash(&new_key),
            schema_version,
            kdf_iterations,
            totp_secret_encrypted: meta
                .totp_secret_encrypted
                .as_deref()
                .map(|json| reseal(old_key, &new_key, json))
                .transpose()?,
            recovery_codes_encrypted: meta
                .recovery_codes_encrypted
                .as_deref()
                .map(|json| reseal(old_key, &new_key, json))
                .transpose()?,
            updated_at: Utc::now(),
            ..meta
        };

        let records_migrated = staged.len();
        debug!(records = records_migrated, "committing re-sealed records");
        self.store
            .commit_rekey(staged.into_values().collect(), &new_meta)
            .await?;

        session.set(SessionKey::new(new_key, target_iterations));
        Ok(RekeyReport {
            records_migrated,
            iterations: target_iterations,
            schema_version,
        })
    }

    /// Wipe all content after exporting a safety-net snapshot.
    ///
    /// Metadata survives with TOTP cleared, so the same password still
    /// unlocks the now-empty vault.
    pub async fn destroy(
        &self,
        session: &mut SessionContext,
        password: &SecretString,
        exporter: &dyn SafetyExporter,
    ) -> Result<DestroyReport, KeywardError> {
        let mut meta = self.metadata.require().await?;
        let salt = kdf::decode_salt(&meta.salt)?;
        let iterations = self.policy.resolve_iterations(&meta);
        if !kdf::verify_password(password, &salt, &meta.verification_hash, iterations).await? {
            return Err(KeywardError::InvalidCredentials);
        }

        let export = exporter.export_snapshot().await?;
        info!(location = %export.location, "safety export written");

        let purge = self.store.purge_content().await?;
        meta.clear_totp();
        self.metadata.save(&mut meta).await?;
        session.clear();

        warn!(
            records = purge.records_deleted,
            categories = purge.categories_deleted,
            tags = purge.tags_deleted,
            "vault content destroyed"
        );
        Ok(DestroyReport { export, purge })
    }

    /// Delete everything, metadata included, without a password.
    pub async fn reset(
        &self,
        session: &mut SessionContext,
        _confirmation: ResetConfirmation,
    ) -> Result<PurgeReport, KeywardError> {
        let purge = self.store.purge_content().await?;
        self.metadata.delete().await?;
        session.clear();
        warn!(records = purge.records_deleted, "vault reset");
        Ok(purge)
    }
}

/// Open an envelope under `old_key` and seal its plaintext under `new_key`.
fn reseal(
    old_key: &[u8; KEY_LEN],
    new_key: &Zeroizing<[u8; KEY_LEN]>,
    envelope_json: &str,
) -> Result<String, KeywardError> {
    let envelope = Envelope::from_json(envelope_json)?;
    let plaintext = crypto::open(old_key, &envelope)?;
    crypto::seal(new_key, &plaintext)?.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::MetaStore;
    use keyward_test_utils::{fast_security_config, MemoryStore};
    use tracing_test::traced_test;

    #[test]
    fn reset_confirmation_requires_exact_phrase() {
        assert!(ResetConfirmation::from_phrase("RESET VAULT").is_ok());
        assert!(ResetConfirmation::from_phrase("  RESET VAULT\n").is_ok());
        assert!(ResetConfirmation::from_phrase("reset vault").is_err());
        assert!(ResetConfirmation::from_phrase("").is_err());
    }

    #[test]
    fn reseal_moves_plaintext_between_keys() {
        let old = crypto::generate_random_key().unwrap();
        let new = crypto::generate_random_key().unwrap();
        let json = crypto::seal(&old, b"hunter2").unwrap().to_json().unwrap();

        let moved = reseal(&old, &new, &json).unwrap();
        let envelope = Envelope::from_json(&moved).unwrap();
        assert_eq!(crypto::open(&new, &envelope).unwrap().as_slice(), b"hunter2");
        assert!(crypto::open(&old, &envelope).is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn schema_repair_is_logged() {
        let store = Arc::new(MemoryStore::new());
        let policy = SecurityPolicy::from_config(&fast_security_config());
        let vault = Vault::new(store.clone(), policy);

        let salt = kdf::generate_salt().unwrap();
        let key = kdf::derive_key(b"pw", &salt, policy.current_iterations).unwrap();
        let now = Utc::now();
        store
            .save_meta(&VaultMeta {
                salt: kdf::encode_salt(&salt),
                verification_hash: kdf::verification_hash(&key),
                schema_version: LEGACY_SCHEMA_VERSION,
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
        let password = SecretString::from("pw".to_string());
        vault.unlock(&mut session, &password).await.unwrap();
        assert!(logs_contain("repairing schema version"));
    }
}
