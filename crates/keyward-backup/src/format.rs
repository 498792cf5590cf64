// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot file layout.
//!
//! ```text
//! KEYWARD-BACKUP/1\n
//! plain | sealed\n
//! <hex sha256 of payload>\n
//! <payload>
//! ```
//!
//! A plain payload is the dataset export JSON. A sealed payload is a
//! [`SealedPayload`] JSON whose envelope holds that export. The checksum
//! covers the stored payload bytes, so integrity can be checked without the
//! backup passphrase.

use keyward_core::KeywardError;
use keyward_vault::Envelope;
use ring::digest;
use serde::{Deserialize, Serialize};

/// First line of every snapshot.
pub const MAGIC: &str = "KEYWARD-BACKUP/1";

/// How the payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayloadMode {
    Plain,
    Sealed,
}

/// Passphrase-sealed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedPayload {
    pub iterations: u32,
    /// Base64 PBKDF2 salt.
    pub salt: String,
    pub envelope: Envelope,
}

/// A snapshot split into its header fields and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub mode: PayloadMode,
    pub checksum: String,
    pub payload: Vec<u8>,
}

impl SnapshotFile {
    /// Wrap `payload`, computing its checksum.
    pub fn new(mode: PayloadMode, payload: Vec<u8>) -> Self {
        Self {
            mode,
            checksum: checksum(&payload),
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let header = format!("{MAGIC}\n{}\n{}\n", self.mode, self.checksum);
        let mut bytes = Vec::with_capacity(header.len() + self.payload.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Split the header from the payload. Does not check the checksum.
    pub fn parse(bytes: &[u8]) -> Result<Self, KeywardError> {
        let mut parts = bytes.splitn(4, |b| *b == b'\n');
        let magic = parts.next().unwrap_or_default();
        if magic != MAGIC.as_bytes() {
            return Err(KeywardError::CorruptBackup("missing backup marker".into()));
        }

        let mode = header_line(parts.next(), "payload mode")?;
        let mode = mode
            .parse::<PayloadMode>()
            .map_err(|_| KeywardError::CorruptBackup(format!("unknown payload mode `{mode}`")))?;
        let checksum = header_line(parts.next(), "checksum")?.to_string();
        let payload = parts
            .next()
            .ok_or_else(|| KeywardError::CorruptBackup("missing payload".into()))?
            .to_vec();

        Ok(Self {
            mode,
            checksum,
            payload,
        })
    }

    /// Whether the stored checksum matches the payload.
    pub fn checksum_matches(&self) -> bool {
        checksum(&self.payload).eq_ignore_ascii_case(&self.checksum)
    }
}

fn header_line<'a>(line: Option<&'a [u8]>, what: &str) -> Result<&'a str, KeywardError> {
    line.and_then(|l| std::str::from_utf8(l).ok())
        .ok_or_else(|| KeywardError::CorruptBackup(format!("missing or unreadable {what}")))
}

/// Lowercase hex SHA-256.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, bytes))
}
