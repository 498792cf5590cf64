// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the vault engine is written against.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility, so
//! the engine can hold an `Arc<dyn VaultStore>`.

pub mod export;
pub mod store;

pub use export::{ExportReceipt, SafetyExporter};
pub use store::{LabelStore, MetaStore, RecordStore, VaultStore};
