// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Keyward integration tests.
//!
//! Provides an in-memory store and cheap key-derivation settings so engine
//! tests run in milliseconds without a database.
//!
//! # Components
//!
//! - [`MemoryStore`] - `VaultStore` backed by in-process maps, with failure injection
//! - [`fast_security_config`] / [`fast_config`] - low iteration counts for tests

pub mod harness;
pub mod memory_store;

pub use harness::{fast_config, fast_security_config, TestDirs};
pub use memory_store::MemoryStore;
