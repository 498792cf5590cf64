// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express, such
//! as the ordering of the iteration-count bounds.

use crate::diagnostic::ConfigError;
use crate::model::KeywardConfig;

/// Largest accepted TOTP clock-skew window, in 30 s steps.
pub const MAX_SKEW_STEPS: u32 = 2;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every violation found rather than stopping at the first one.
pub fn validate_config(config: &KeywardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let sec = &config.security;
    if sec.min_iterations == 0 {
        fail("security.min_iterations must be at least 1".to_string());
    }
    if sec.min_iterations > sec.max_iterations {
        fail(format!(
            "security.min_iterations ({}) must not exceed security.max_iterations ({})",
            sec.min_iterations, sec.max_iterations
        ));
    }
    if sec.legacy_iterations > sec.current_iterations {
        fail(format!(
            "security.legacy_iterations ({}) must not exceed security.current_iterations ({})",
            sec.legacy_iterations, sec.current_iterations
        ));
    }
    if sec.current_iterations < sec.min_iterations || sec.current_iterations > sec.max_iterations {
        fail(format!(
            "security.current_iterations ({}) must lie within {}..={}",
            sec.current_iterations, sec.min_iterations, sec.max_iterations
        ));
    }

    if config.totp.issuer.trim().is_empty() {
        fail("totp.issuer must not be empty".to_string());
    }
    if config.totp.issuer.contains(':') {
        fail("totp.issuer must not contain `:`".to_string());
    }
    if config.totp.skew_steps > MAX_SKEW_STEPS {
        fail(format!(
            "totp.skew_steps must be at most {MAX_SKEW_STEPS}, got {}",
            config.totp.skew_steps
        ));
    }

    if config.backup.directory.trim().is_empty() {
        fail("backup.directory must not be empty".to_string());
    }
    if config.backup.iterations < sec.min_iterations {
        fail(format!(
            "backup.iterations ({}) must be at least security.min_iterations ({})",
            config.backup.iterations, sec.min_iterations
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
