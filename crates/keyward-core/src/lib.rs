// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Keyward secret store.
//!
//! This crate provides the error type, the persisted and derived domain
//! types, and the storage/export traits the vault engine is written
//! against. Storage backends and the backup layer implement these traits;
//! nothing here depends on them.

pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, KeywardError};
pub use outcome::Outcome;
pub use traits::{
    ExportReceipt, LabelStore, MetaStore, RecordStore, SafetyExporter, VaultStore,
};
pub use types::{
    Category, Credential, DatasetExport, MergeReport, PurgeReport, RecordSummary, RestoreMode,
    SecurityInfo, SecurityLevel, StoredRecord, Tag, TotpCheck, VaultMeta, VaultStatus,
    DEFAULT_CATEGORIES, EXPORT_FORMAT_VERSION,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn every_error_maps_to_its_kind() {
        let cases = [
            (KeywardError::AlreadyInitialized, ErrorKind::AlreadyInitialized),
            (KeywardError::NotInitialized, ErrorKind::NotInitialized),
            (KeywardError::InvalidCredentials, ErrorKind::InvalidCredentials),
            (KeywardError::VaultLocked, ErrorKind::VaultLocked),
            (KeywardError::AuthenticationFailed, ErrorKind::AuthenticationFailed),
            (KeywardError::CorruptBackup("x".into()), ErrorKind::CorruptBackup),
            (
                KeywardError::OutOfRange {
                    value: 1,
                    min: 2,
                    max: 3,
                },
                ErrorKind::OutOfRange,
            ),
            (KeywardError::TotpNotEnabled, ErrorKind::TotpNotEnabled),
            (KeywardError::storage(std::io::Error::other("disk")), ErrorKind::Storage),
            (KeywardError::Internal("x".into()), ErrorKind::Internal),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
        }
    }

    #[test]
    fn error_kind_display_round_trips() {
        let kind = ErrorKind::InvalidCredentials;
        assert_eq!(kind.to_string(), "invalid_credentials");
        assert_eq!(ErrorKind::from_str("invalid_credentials").unwrap(), kind);
    }

    #[test]
    fn outcome_from_error_carries_message_and_kind() {
        let outcome: Outcome<()> = Err(KeywardError::VaultLocked).into();
        assert!(!outcome.success);
        assert_eq!(outcome.kind, Some(ErrorKind::VaultLocked));
        assert_eq!(outcome.error.as_deref(), Some("vault is locked"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "vault_locked");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn outcome_success_omits_error() {
        let outcome: Outcome<u32> = Ok(7).into();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 7);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn totp_check_permits() {
        assert!(TotpCheck::NotRequired.permits());
        assert!(TotpCheck::Valid.permits());
        assert!(!TotpCheck::Invalid.permits());
        assert_ne!(TotpCheck::NotRequired, TotpCheck::Valid);
    }

    #[test]
    fn restore_mode_parses_from_cli_strings() {
        assert_eq!(RestoreMode::from_str("merge").unwrap(), RestoreMode::Merge);
        assert_eq!(RestoreMode::from_str("overwrite").unwrap(), RestoreMode::Overwrite);
        assert!(RestoreMode::from_str("append").is_err());
    }

    #[test]
    fn vault_meta_uses_camel_case_fields() {
        let now = chrono::Utc::now();
        let meta = VaultMeta {
            salt: "c2FsdA==".into(),
            verification_hash: "aGFzaA==".into(),
            schema_version: 2,
            kdf_iterations: None,
            totp_enabled: false,
            totp_secret_encrypted: None,
            recovery_codes_encrypted: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["schemaVersion"], 2);
        assert_eq!(json["verificationHash"], "aGFzaA==");
        assert!(json.get("kdfIterations").is_none());
        let back: VaultMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
