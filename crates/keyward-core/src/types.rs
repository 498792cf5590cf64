// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Keyward workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted row that gates the vault.
///
/// Only non-secret material lives here: the salt, a hash of the derived key,
/// and envelopes that can only be opened with the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMeta {
    /// 32 random bytes, base64.
    pub salt: String,
    /// sha256 of the derived key, base64.
    pub verification_hash: String,
    /// 1 = legacy iteration count, 2 = strong iteration count.
    pub schema_version: u32,
    /// Explicit iteration count, present only when it differs from the
    /// count implied by `schema_version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_iterations: Option<u32>,
    pub totp_enabled: bool,
    #[serde(default)]
    pub totp_secret_encrypted: Option<String>,
    #[serde(default)]
    pub recovery_codes_encrypted: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultMeta {
    /// Drops every piece of TOTP state.
    pub fn clear_totp(&mut self) {
        self.totp_enabled = false;
        self.totp_secret_encrypted = None;
        self.recovery_codes_encrypted = None;
    }
}

/// A stored record: an envelope plus the cleartext index fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub category: Option<String>,
    /// JSON-encoded envelope (`{"nonce","ciphertext","tag"}`).
    pub envelope: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ids and names of the categories every vault starts with.
pub const DEFAULT_CATEGORIES: [(&str, &str); 3] =
    [("login", "Login"), ("card", "Card"), ("note", "Note")];

/// A record category. Default categories survive `destroy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// A user-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The plaintext shape of a credential record before it is sealed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    pub secret: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Cleartext listing entry for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredRecord> for RecordSummary {
    fn from(record: &StoredRecord) -> Self {
        Self {
            id: record.id.clone(),
            category: record.category.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Coarse strength rating for the KDF iteration count in force.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
}

/// Derived view of the KDF parameters in force. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityInfo {
    pub iterations: u32,
    pub schema_version: u32,
    pub security_level: SecurityLevel,
    pub needs_upgrade: bool,
}

/// Lifecycle state of a vault as seen by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VaultStatus {
    Uninitialized,
    Locked,
    Unlocked,
}

/// Result of a second-factor check.
///
/// `NotRequired` is distinct from `Valid` so that callers cannot confuse an
/// absent gate with a passed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TotpCheck {
    NotRequired,
    Valid,
    Invalid,
}

impl TotpCheck {
    /// Whether the caller may proceed past the gate.
    pub fn permits(self) -> bool {
        matches!(self, Self::NotRequired | Self::Valid)
    }
}

/// How a restore treats data already in the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RestoreMode {
    /// Destructively replace every record, category, tag and the metadata.
    Overwrite,
    /// Insert only ids that do not exist yet.
    Merge,
}

/// Version of the [`DatasetExport`] JSON layout.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Full export of a vault's persisted state. Records stay sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetExport {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub meta: Option<VaultMeta>,
    pub records: Vec<StoredRecord>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
}

/// Counts of what `purge_content` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub records_deleted: usize,
    pub categories_deleted: usize,
    pub tags_deleted: usize,
}

/// Outcome of a merge import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub records_inserted: usize,
    pub categories_inserted: usize,
    pub tags_inserted: usize,
    /// Record ids that already existed and were left untouched.
    pub skipped_records: Vec<String>,
    pub skipped_categories: Vec<String>,
    pub skipped_tags: Vec<String>,
}

impl MergeReport {
    /// Total number of skipped ids across records, categories and tags.
    pub fn skipped_total(&self) -> usize {
        self.skipped_records.len() + self.skipped_categories.len() + self.skipped_tags.len()
    }
}
