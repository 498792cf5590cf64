// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `init`, `status`, `unlock`, `change-password`, `upgrade`, `destroy` and
//! `reset`.

use std::io::{BufRead, IsTerminal};

use serde::Serialize;

use keyward_core::{KeywardError, SecurityInfo, VaultStatus};
use keyward_vault::prompt::prompt_new_secret;
use keyward_vault::{
    get_vault_passphrase_with_confirm, ResetConfirmation, SessionContext, RESET_PHRASE,
};

use crate::app::{App, SecondFactor};
use crate::output::Output;

#[derive(Debug, Serialize)]
struct InitReport {
    iterations: u32,
    database: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    status: VaultStatus,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    security: Option<SecurityInfo>,
    totp_enabled: bool,
    records: usize,
}

pub async fn init(app: &App, out: &Output) -> Result<(), KeywardError> {
    if app.vault.is_initialized().await? {
        return Err(KeywardError::AlreadyInitialized);
    }
    let password = get_vault_passphrase_with_confirm()?;
    let mut session = SessionContext::new();
    app.vault.setup(&mut session, &password).await?;

    let report = InitReport {
        iterations: session.iterations().unwrap_or(app.vault.policy().current_iterations),
        database: app.config.storage.database_path.clone(),
    };
    out.emit(&report, |out| {
        out.ok("vault created");
        out.field("database", &report.database);
        out.field("iterations", &report.iterations.to_string());
    });
    Ok(())
}

pub async fn status(app: &App, out: &Output) -> Result<(), KeywardError> {
    let status = app.vault.status(&SessionContext::new()).await?;
    let initialized = status != VaultStatus::Uninitialized;
    let report = StatusReport {
        status,
        database: app.config.storage.database_path.clone(),
        security: if initialized {
            Some(app.vault.security_info().await?)
        } else {
            None
        },
        totp_enabled: initialized && app.totp.is_enabled().await?,
        records: app.vault.list_records().await?.len(),
    };

    out.emit(&report, |out| {
        out.field("status", &report.status.to_string());
        out.field("database", &report.database);
        if let Some(security) = &report.security {
            out.field("iterations", &security.iterations.to_string());
            out.field("schema version", &security.schema_version.to_string());
            out.field("security level", &security.security_level.to_string());
            out.field(
                "two-factor",
                if report.totp_enabled { "enabled" } else { "disabled" },
            );
            out.field("records", &report.records.to_string());
            if security.needs_upgrade {
                out.warn("key derivation is below the current policy; run `keyward upgrade`");
            }
        }
    });
    Ok(())
}

/// Check the password and second factor without doing anything else.
pub async fn unlock(app: &App, factor: &SecondFactor, out: &Output) -> Result<(), KeywardError> {
    let unlocked = app.unlock(factor).await?;
    out.emit(&unlocked.report, |out| {
        out.ok("credentials accepted");
        if unlocked.report.repaired_schema_version {
            out.warn("vault metadata was out of date and has been repaired");
        }
    });
    Ok(())
}

pub async fn change_password(
    app: &App,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let mut unlocked = app.unlock(factor).await?;
    let new_password = prompt_new_secret("New master password: ", "Confirm new master password: ")?;
    let report = app
        .vault
        .change_master_password(&mut unlocked.session, &unlocked.password, &new_password)
        .await?;
    out.emit(&report, |out| {
        out.ok("master password changed");
        out.field("records re-sealed", &report.records_migrated.to_string());
        out.field("iterations", &report.iterations.to_string());
    });
    Ok(())
}

pub async fn upgrade(
    app: &App,
    iterations: Option<u32>,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    let mut unlocked = app.unlock(factor).await?;
    let report = app
        .vault
        .upgrade_security_params(&mut unlocked.session, &unlocked.password, iterations)
        .await?;
    out.emit(&report, |out| {
        out.ok("security parameters upgraded");
        out.field("iterations", &report.iterations.to_string());
        out.field("schema version", &report.schema_version.to_string());
        out.field("records re-sealed", &report.records_migrated.to_string());
    });
    Ok(())
}

pub async fn destroy(app: &App, factor: &SecondFactor, out: &Output) -> Result<(), KeywardError> {
    let mut unlocked = app.unlock(factor).await?;
    let exporter = app.safety_exporter("safety");
    let report = app
        .vault
        .destroy(&mut unlocked.session, &unlocked.password, &exporter)
        .await?;
    out.emit(&report, |out| {
        out.warn("vault content destroyed");
        out.field("safety snapshot", &report.export.location);
        out.field("records deleted", &report.purge.records_deleted.to_string());
    });
    Ok(())
}

pub async fn reset(app: &App, confirm: Option<String>, out: &Output) -> Result<(), KeywardError> {
    let phrase = match confirm {
        Some(phrase) => phrase,
        None => read_confirmation()?,
    };
    let confirmation = ResetConfirmation::from_phrase(&phrase)?;
    let report = app.vault.reset(&mut SessionContext::new(), confirmation).await?;
    out.emit(&report, |out| {
        out.warn("vault reset; every record and the master password are gone");
        out.field("records deleted", &report.records_deleted.to_string());
    });
    Ok(())
}

fn read_confirmation() -> Result<String, KeywardError> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(KeywardError::Config(format!(
            "reset needs confirmation; pass --confirm \"{RESET_PHRASE}\""
        )));
    }
    eprint!("This deletes every record and the master password. Type {RESET_PHRASE} to confirm: ");
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .map_err(|e| KeywardError::Internal(format!("failed to read confirmation: {e}")))?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_test_utils::{fast_config, TestDirs};
    use keyward_vault::prompt::VAULT_KEY_ENV_VAR;
    use secrecy::SecretString;
    use serial_test::serial;

    fn password(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    async fn app(dirs: &TestDirs) -> App {
        App::open(fast_config(dirs)).await.unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn init_reads_password_from_env() {
        let dirs = TestDirs::new().unwrap();
        let app = app(&dirs).await;
        let out = Output::new(true, true);

        // SAFETY: serialized by #[serial]; no other thread reads the env here.
        unsafe { std::env::set_var(VAULT_KEY_ENV_VAR, "Tr0ub4dor&3") };
        init(&app, &out).await.unwrap();
        let second = init(&app, &out).await;
        unsafe { std::env::remove_var(VAULT_KEY_ENV_VAR) };

        assert!(matches!(second, Err(KeywardError::AlreadyInitialized)));
        app.unlock_with(password("Tr0ub4dor&3"), &SecondFactor::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_of_fresh_database() {
        let dirs = TestDirs::new().unwrap();
        let app = app(&dirs).await;
        status(&app, &Output::new(true, true)).await.unwrap();
        assert!(!app.vault.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn reset_rejects_wrong_phrase() {
        let dirs = TestDirs::new().unwrap();
        let app = app(&dirs).await;
        let mut session = SessionContext::new();
        app.vault.setup(&mut session, &password("pw")).await.unwrap();

        let out = Output::new(true, true);
        let err = reset(&app, Some("reset".to_string()), &out).await.unwrap_err();
        assert!(matches!(err, KeywardError::InvalidCredentials));
        assert!(app.vault.is_initialized().await.unwrap());

        reset(&app, Some(RESET_PHRASE.to_string()), &out).await.unwrap();
        assert!(!app.vault.is_initialized().await.unwrap());
    }
}
