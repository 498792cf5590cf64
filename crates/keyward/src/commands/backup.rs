// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyward backup create|verify|restore`.

use std::path::PathBuf;

use clap::Subcommand;
use secrecy::SecretString;
use tracing::info;

use keyward_backup::{read_snapshot, write_snapshot, BackupCodec, PayloadMode, RestoreReport};
use keyward_core::{KeywardError, RestoreMode, SafetyExporter};
use keyward_vault::prompt::{prompt_new_secret, prompt_secret};

use crate::app::App;
use crate::output::Output;

/// Environment variable holding the passphrase for sealed backups.
pub const BACKUP_KEY_ENV_VAR: &str = "KEYWARD_BACKUP_KEY";

#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// Write a snapshot of the whole vault to a file.
    Create {
        path: PathBuf,
        /// Seal the snapshot under a separate backup passphrase.
        #[arg(long)]
        encrypt: bool,
    },
    /// Check a snapshot's marker and checksum.
    Verify { path: PathBuf },
    /// Load a snapshot into the vault.
    Restore {
        path: PathBuf,
        /// `overwrite` replaces everything; `merge` only adds missing ids.
        #[arg(long, default_value = "merge")]
        mode: RestoreMode,
        /// Required for `--mode overwrite`.
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(app: &App, command: BackupCommand, out: &Output) -> Result<(), KeywardError> {
    match command {
        BackupCommand::Create { path, encrypt } => {
            let passphrase = if encrypt {
                Some(backup_passphrase(true)?)
            } else {
                None
            };
            let snapshot = app.codec.create_snapshot(passphrase.as_ref()).await?;
            let receipt = write_snapshot(&snapshot, &path).await?;
            info!(location = %receipt.location, mode = %snapshot.mode, "backup written");
            out.emit(&receipt, |out| {
                out.ok(&format!("backup written to {}", receipt.location));
                out.field("sha256", &receipt.checksum);
                out.field("mode", &snapshot.mode.to_string());
            });
            Ok(())
        }
        BackupCommand::Verify { path } => {
            let bytes = read_snapshot(&path).await?;
            let report = BackupCodec::verify(&bytes);
            if !report.valid {
                return Err(KeywardError::CorruptBackup(
                    report.error.unwrap_or_else(|| "unknown".to_string()),
                ));
            }
            out.emit(&report, |out| out.ok("backup is intact"));
            Ok(())
        }
        BackupCommand::Restore { path, mode, yes } => restore(app, &path, mode, yes, out).await,
    }
}

async fn restore(
    app: &App,
    path: &std::path::Path,
    mode: RestoreMode,
    yes: bool,
    out: &Output,
) -> Result<(), KeywardError> {
    if mode == RestoreMode::Overwrite && !yes {
        return Err(KeywardError::Config(
            "overwrite replaces every record and the master password; pass --yes".to_string(),
        ));
    }

    let bytes = read_snapshot(path).await?;
    let report = BackupCodec::verify(&bytes);
    if !report.valid {
        return Err(KeywardError::CorruptBackup(
            report.error.unwrap_or_else(|| "unknown".to_string()),
        ));
    }
    let passphrase = if report.mode == Some(PayloadMode::Sealed) {
        Some(backup_passphrase(false)?)
    } else {
        None
    };

    if mode == RestoreMode::Overwrite && app.vault.is_initialized().await? {
        let receipt = app
            .safety_exporter("pre-restore")
            .export_snapshot()
            .await?;
        if !out.is_json() {
            eprintln!("Safety snapshot written to {}", receipt.location);
        }
    }

    let restored = app.codec.restore(&bytes, mode, passphrase.as_ref()).await?;
    out.emit(&restored, |out| match &restored {
        RestoreReport::Overwrite { records, .. } => {
            out.ok(&format!("vault replaced from backup ({records} records)"));
        }
        RestoreReport::Merge {
            report,
            adopted_metadata,
        } => {
            out.ok(&format!("{} records added", report.records_inserted));
            if !report.skipped_records.is_empty() {
                out.field("skipped", &report.skipped_records.join(", "));
            }
            if *adopted_metadata {
                out.field("master password", "taken from the backup");
            }
        }
    });
    Ok(())
}

fn backup_passphrase(confirm: bool) -> Result<SecretString, KeywardError> {
    if let Ok(value) = std::env::var(BACKUP_KEY_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }
    if confirm {
        prompt_new_secret("Backup passphrase: ", "Confirm backup passphrase: ")
    } else {
        prompt_secret("Backup passphrase: ")
    }
}
