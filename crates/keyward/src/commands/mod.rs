// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand handlers. Each takes the opened [`crate::app::App`] and an
//! [`crate::output::Output`] and returns the error for `main` to report.

pub mod backup;
pub mod records;
pub mod totp;
pub mod vault;
