// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety-net export hook run before destructive operations.
//!
//! The vault crate only knows this trait. The backup crate implements it,
//! so there is no reference from the vault engine back to backup code.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::KeywardError;

/// Where a safety-net export ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    /// Human-readable location (file path, object key, ...).
    pub location: String,
    /// Hex SHA-256 checksum of the exported payload.
    pub checksum: String,
    /// Size of the exported snapshot in bytes.
    pub size: usize,
}

/// Produces a full export of the vault before it is wiped.
#[async_trait]
pub trait SafetyExporter: Send + Sync {
    /// Exports the current dataset and reports where it went.
    async fn export_snapshot(&self) -> Result<ExportReceipt, KeywardError>;
}
