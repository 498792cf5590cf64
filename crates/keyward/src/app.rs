// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by every command: store, vault, TOTP gate and backup codec.

use std::sync::Arc;

use clap::Args;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use keyward_backup::{BackupCodec, FileSafetyExporter};
use keyward_config::KeywardConfig;
use keyward_core::{KeywardError, VaultStore};
use keyward_storage::SqliteStore;
use keyward_vault::prompt::{get_vault_passphrase, prompt_secret};
use keyward_vault::{SecurityPolicy, SessionContext, TotpGate, UnlockReport, Vault};

/// Second-factor input for commands that need an unlocked vault.
#[derive(Args, Debug, Default, Clone)]
pub struct SecondFactor {
    /// Six-digit code from the authenticator app.
    #[arg(long, global = true, value_name = "CODE")]
    pub code: Option<String>,

    /// One of the recovery codes, used instead of an authenticator code.
    #[arg(long, global = true, value_name = "CODE", conflicts_with = "code")]
    pub recovery_code: Option<String>,
}

/// A vault unlocked for the duration of one command.
pub struct Unlocked {
    pub session: SessionContext,
    pub password: SecretString,
    pub report: UnlockReport,
}

pub struct App {
    pub config: KeywardConfig,
    pub store: Arc<SqliteStore>,
    pub vault: Vault,
    pub totp: TotpGate,
    pub codec: BackupCodec,
}

impl App {
    pub async fn open(config: KeywardConfig) -> Result<Self, KeywardError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        let dyn_store: Arc<dyn VaultStore> = store.clone();
        let vault = Vault::new(
            dyn_store.clone(),
            SecurityPolicy::from_config(&config.security),
        );
        let totp = TotpGate::new(vault.metadata().clone(), config.totp.clone());
        let codec = BackupCodec::new(dyn_store, &config.backup, &config.security);
        Ok(Self {
            config,
            store,
            vault,
            totp,
            codec,
        })
    }

    /// Exporter writing into the configured backup directory.
    pub fn safety_exporter(&self, prefix: &str) -> FileSafetyExporter {
        FileSafetyExporter::new(self.codec.clone(), &self.config.backup.directory)
            .with_prefix(prefix)
    }

    /// Ask for the master password, unlock, then pass the second factor if
    /// one is enabled.
    pub async fn unlock(&self, factor: &SecondFactor) -> Result<Unlocked, KeywardError> {
        let password = get_vault_passphrase()?;
        self.unlock_with(password, factor).await
    }

    pub async fn unlock_with(
        &self,
        password: SecretString,
        factor: &SecondFactor,
    ) -> Result<Unlocked, KeywardError> {
        let mut unlocked = self.password_unlock(password).await?;
        if let Err(e) = self.second_factor(&unlocked.session, factor).await {
            self.vault.lock(&mut unlocked.session);
            return Err(e);
        }
        Ok(unlocked)
    }

    /// Unlock with the master password alone. For `totp verify` and
    /// `totp recover`, which check the second factor themselves.
    pub async fn unlock_password_only(&self) -> Result<Unlocked, KeywardError> {
        self.password_unlock(get_vault_passphrase()?).await
    }

    async fn password_unlock(&self, password: SecretString) -> Result<Unlocked, KeywardError> {
        let mut session = SessionContext::new();
        let report = self.vault.unlock(&mut session, &password).await?;
        Ok(Unlocked {
            session,
            password,
            report,
        })
    }

    async fn second_factor(
        &self,
        session: &SessionContext,
        factor: &SecondFactor,
    ) -> Result<(), KeywardError> {
        if !self.totp.is_enabled().await? {
            return Ok(());
        }

        let check = if let Some(code) = &factor.recovery_code {
            self.totp.verify_recovery_code(session, code).await?
        } else {
            let code = match &factor.code {
                Some(code) => code.clone(),
                None => prompt_secret("Authentication code: ")?
                    .expose_secret()
                    .to_string(),
            };
            self.totp.verify_code(session, &code).await?
        };
        debug!(%check, "second factor checked");

        if check.permits() {
            Ok(())
        } else {
            Err(KeywardError::InvalidCredentials)
        }
    }

    /// Flush the database before exit.
    pub async fn close(&self) -> Result<(), KeywardError> {
        self.store.close().await
    }
}
