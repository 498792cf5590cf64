// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration presets and scratch directories for tests.

use std::path::{Path, PathBuf};

use keyward_config::model::{KeywardConfig, SecurityConfig};
use tempfile::TempDir;

/// Legacy count used by [`fast_security_config`].
pub const FAST_LEGACY_ITERATIONS: u32 = 1_000;

/// Current count used by [`fast_security_config`].
pub const FAST_CURRENT_ITERATIONS: u32 = 2_000;

/// Iteration policy with the same shape as the defaults, scaled down so a
/// derivation takes microseconds.
pub fn fast_security_config() -> SecurityConfig {
    SecurityConfig {
        legacy_iterations: FAST_LEGACY_ITERATIONS,
        current_iterations: FAST_CURRENT_ITERATIONS,
        min_iterations: 500,
        max_iterations: 50_000,
    }
}

/// A full configuration using [`fast_security_config`] and paths inside `dirs`.
pub fn fast_config(dirs: &TestDirs) -> KeywardConfig {
    let mut config = KeywardConfig::default();
    config.security = fast_security_config();
    config.backup.iterations = FAST_LEGACY_ITERATIONS;
    config.storage.database_path = dirs.database_path().to_string_lossy().into_owned();
    config.backup.directory = dirs.backup_dir().to_string_lossy().into_owned();
    config
}

/// A temporary directory holding a database path and a backup directory.
///
/// Everything is removed when the value is dropped.
pub struct TestDirs {
    root: TempDir,
}

impl TestDirs {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.path().join("keyward.db")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.path().join("backups")
    }
}
