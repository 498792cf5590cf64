// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Keyward secret store.

use thiserror::Error;

/// The single error type shared by every Keyward crate.
///
/// None of these are retried internally: each failure is reported once to
/// the caller, and the vault stays in the state it was in before the call.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// `setup` was called on a vault that already has metadata.
    #[error("vault already initialized")]
    AlreadyInitialized,

    /// An operation needs vault metadata but none has been written yet.
    #[error("vault not initialized")]
    NotInitialized,

    /// Wrong master password, TOTP code, or recovery code.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An operation needing the session key ran while the vault was locked.
    #[error("vault is locked")]
    VaultLocked,

    /// AES-GCM tag mismatch: wrong key, corrupted or tampered ciphertext.
    #[error("authentication failed -- wrong key or corrupted data")]
    AuthenticationFailed,

    /// Backup checksum mismatch, bad magic marker, or unreadable payload.
    #[error("corrupt backup: {0}")]
    CorruptBackup(String),

    /// A KDF iteration count outside the configured bounds.
    #[error("iteration count {value} out of range ({min}..={max})")]
    OutOfRange { value: u32, min: u32, max: u32 },

    /// A TOTP operation that needs an enabled gate ran while it was disabled.
    #[error("two-factor authentication is not enabled")]
    TotpNotEnabled,

    /// A backup that is intact but cannot be applied to this vault.
    #[error("incompatible backup: {0}")]
    IncompatibleBackup(String),

    /// A requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Low-level cryptographic failure (RNG, key construction, bad lengths).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serialization or encoding errors for persisted structures.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Flat discriminant of [`KeywardError`], safe to hand to a UI layer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    AlreadyInitialized,
    NotInitialized,
    InvalidCredentials,
    VaultLocked,
    AuthenticationFailed,
    CorruptBackup,
    OutOfRange,
    TotpNotEnabled,
    IncompatibleBackup,
    NotFound,
    Crypto,
    Storage,
    Serialization,
    Config,
    Internal,
}

impl KeywardError {
    /// Returns the flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::VaultLocked => ErrorKind::VaultLocked,
            Self::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Self::CorruptBackup(_) => ErrorKind::CorruptBackup,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::TotpNotEnabled => ErrorKind::TotpNotEnabled,
            Self::IncompatibleBackup(_) => ErrorKind::IncompatibleBackup,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for KeywardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
