// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Iteration-count policy: which count a vault uses, how strong that is, and
//! what an upgrade may ask for.

use keyward_config::model::{
    SecurityConfig, CURRENT_ITERATIONS, LEGACY_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS,
};
use keyward_core::{KeywardError, SecurityInfo, SecurityLevel, VaultMeta};

/// Schema version of vaults derived with the legacy count.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Schema version of vaults derived with the current count.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Below this many iterations a vault is rated `low`.
pub const MEDIUM_LEVEL_THRESHOLD: u32 = 300_000;

/// From this many iterations on a vault is rated `high`.
pub const HIGH_LEVEL_THRESHOLD: u32 = 600_000;

/// Iteration-count policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub legacy_iterations: u32,
    pub current_iterations: u32,
    pub min_iterations: u32,
    pub max_iterations: u32,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            legacy_iterations: LEGACY_ITERATIONS,
            current_iterations: CURRENT_ITERATIONS,
            min_iterations: MIN_ITERATIONS,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl SecurityPolicy {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            legacy_iterations: config.legacy_iterations,
            current_iterations: config.current_iterations,
            min_iterations: config.min_iterations,
            max_iterations: config.max_iterations,
        }
    }

    /// Iteration count implied by a schema version.
    ///
    /// Version 1 means legacy; every later version means current.
    pub fn iterations_for(&self, schema_version: u32) -> u32 {
        if schema_version <= LEGACY_SCHEMA_VERSION {
            self.legacy_iterations
        } else {
            self.current_iterations
        }
    }

    /// Iteration count a vault was actually derived with.
    ///
    /// An explicit override recorded by an upgrade wins over the schema
    /// version's implied count.
    pub fn resolve_iterations(&self, meta: &VaultMeta) -> u32 {
        meta.kdf_iterations
            .unwrap_or_else(|| self.iterations_for(meta.schema_version))
    }

    /// Schema version and override to persist for a vault derived with
    /// `iterations`.
    ///
    /// The override is only stored when the schema version alone would
    /// resolve to a different count.
    pub fn schema_for(&self, iterations: u32) -> (u32, Option<u32>) {
        let schema_version = if iterations >= self.current_iterations {
            CURRENT_SCHEMA_VERSION
        } else {
            LEGACY_SCHEMA_VERSION
        };
        let implied = self.iterations_for(schema_version);
        let explicit = (implied != iterations).then_some(iterations);
        (schema_version, explicit)
    }

    /// Rejects counts outside `min_iterations..=max_iterations`.
    pub fn check_range(&self, iterations: u32) -> Result<u32, KeywardError> {
        if (self.min_iterations..=self.max_iterations).contains(&iterations) {
            Ok(iterations)
        } else {
            Err(KeywardError::OutOfRange {
                value: iterations,
                min: self.min_iterations,
                max: self.max_iterations,
            })
        }
    }

    pub fn needs_upgrade(&self, meta: &VaultMeta) -> bool {
        self.resolve_iterations(meta) < self.current_iterations
    }

    pub fn security_info(&self, meta: &VaultMeta) -> SecurityInfo {
        let iterations = self.resolve_iterations(meta);
        SecurityInfo {
            iterations,
            schema_version: meta.schema_version,
            security_level: security_level_for(iterations),
            needs_upgrade: iterations < self.current_iterations,
        }
    }
}

/// Absolute strength rating of an iteration count.
pub fn security_level_for(iterations: u32) -> SecurityLevel {
    if iterations < MEDIUM_LEVEL_THRESHOLD {
        SecurityLevel::Low
    } else if iterations < HIGH_LEVEL_THRESHOLD {
        SecurityLevel::Medium
    } else {
        SecurityLevel::High
    }
}
