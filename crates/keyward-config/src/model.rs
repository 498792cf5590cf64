// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Keyward secret store.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Iteration count used by vaults created before the strong default.
pub const LEGACY_ITERATIONS: u32 = 100_000;

/// Strong PBKDF2-HMAC-SHA256 iteration count for new and upgraded vaults.
pub const CURRENT_ITERATIONS: u32 = 600_000;

/// Lowest iteration count accepted for a user-supplied override.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Highest iteration count accepted for a user-supplied override.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Top-level Keyward configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeywardConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key-derivation policy.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Two-factor authentication settings.
    #[serde(default)]
    pub totp: TotpConfig,

    /// Backup and safety-net export settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("keyward").join("keyward.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("keyward.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Key-derivation policy.
///
/// `legacy_iterations` is what schema version 1 vaults were written with,
/// `current_iterations` is what setup and upgrades use. Overrides passed to
/// an upgrade must fall inside `min_iterations..=max_iterations`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    #[serde(default = "default_legacy_iterations")]
    pub legacy_iterations: u32,

    #[serde(default = "default_current_iterations")]
    pub current_iterations: u32,

    #[serde(default = "default_min_iterations")]
    pub min_iterations: u32,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            legacy_iterations: default_legacy_iterations(),
            current_iterations: default_current_iterations(),
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_legacy_iterations() -> u32 {
    LEGACY_ITERATIONS
}

fn default_current_iterations() -> u32 {
    CURRENT_ITERATIONS
}

fn default_min_iterations() -> u32 {
    MIN_ITERATIONS
}

fn default_max_iterations() -> u32 {
    MAX_ITERATIONS
}

/// Two-factor authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TotpConfig {
    /// Issuer shown by authenticator apps.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Account label embedded in the provisioning URI.
    #[serde(default = "default_account_name")]
    pub account_name: String,

    /// Number of 30 s steps accepted on either side of the current one.
    #[serde(default = "default_skew_steps")]
    pub skew_steps: u32,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            account_name: default_account_name(),
            skew_steps: default_skew_steps(),
        }
    }
}

fn default_issuer() -> String {
    "Keyward".to_string()
}

fn default_account_name() -> String {
    "vault".to_string()
}

fn default_skew_steps() -> u32 {
    1
}

/// Backup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Directory for safety-net exports written before `destroy`.
    #[serde(default = "default_backup_directory")]
    pub directory: String,

    /// PBKDF2 iteration count for passphrase-sealed backups.
    #[serde(default = "default_current_iterations")]
    pub iterations: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: default_backup_directory(),
            iterations: default_current_iterations(),
        }
    }
}

fn default_backup_directory() -> String {
    dirs::data_dir()
        .map(|p| p.join("keyward").join("backups"))
        .unwrap_or_else(|| std::path::PathBuf::from("keyward-backups"))
        .to_string_lossy()
        .into_owned()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
