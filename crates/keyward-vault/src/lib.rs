// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault security engine for the Keyward secret store.
//!
//! Records are sealed with AES-256-GCM under a key derived from the master
//! password with PBKDF2-HMAC-SHA256. The derived key exists only inside a
//! caller-owned [`SessionContext`]; the store sees envelopes and a
//! verification hash, never the key.

pub mod crypto;
pub mod kdf;
pub mod lifecycle;
pub mod meta;
pub mod policy;
pub mod prompt;
pub mod records;
pub mod session;
pub mod totp;

pub use crypto::Envelope;
pub use lifecycle::{
    DestroyReport, RekeyReport, ResetConfirmation, UnlockReport, Vault, RESET_PHRASE,
};
pub use meta::VaultMetadataStore;
pub use policy::{security_level_for, SecurityPolicy};
pub use prompt::{get_vault_passphrase, get_vault_passphrase_with_confirm};
pub use records::mask_secret;
pub use session::{SessionContext, SessionKey};
pub use totp::{TotpGate, TotpSetup};
