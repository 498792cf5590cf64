// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition via TTY prompt or KEYWARD_VAULT_KEY environment variable.

use keyward_core::KeywardError;
use secrecy::SecretString;

/// The environment variable name for providing the master password.
pub const VAULT_KEY_ENV_VAR: &str = "KEYWARD_VAULT_KEY";

const NO_SOURCE: &str =
    "no master password provided; set KEYWARD_VAULT_KEY or run interactively";

/// Get the master password from the environment variable or a TTY prompt.
///
/// Priority:
/// 1. `KEYWARD_VAULT_KEY` environment variable (for scripts and CI)
/// 2. Interactive TTY prompt via `rpassword`
pub fn get_vault_passphrase() -> Result<SecretString, KeywardError> {
    if let Some(key) = env_passphrase() {
        return Ok(key);
    }
    prompt_secret("Master password: ")
}

/// Get a new master password, asking twice on a TTY.
///
/// The environment variable needs no confirmation.
pub fn get_vault_passphrase_with_confirm() -> Result<SecretString, KeywardError> {
    if let Some(key) = env_passphrase() {
        return Ok(key);
    }
    prompt_new_secret("New master password: ", "Confirm master password: ")
}

/// Prompt for a value without echo. Only works on a TTY.
pub fn prompt_secret(label: &str) -> Result<SecretString, KeywardError> {
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(KeywardError::Config(NO_SOURCE.to_string()));
    }
    eprint!("{label}");
    let value = rpassword::read_password()
        .map_err(|e| KeywardError::Internal(format!("failed to read from terminal: {e}")))?;
    if value.is_empty() {
        return Err(KeywardError::Config("empty value not allowed".to_string()));
    }
    Ok(SecretString::from(value))
}

/// Prompt twice and require both entries to match.
pub fn prompt_new_secret(label: &str, confirm_label: &str) -> Result<SecretString, KeywardError> {
    use secrecy::ExposeSecret;

    let first = prompt_secret(label)?;
    let second = prompt_secret(confirm_label)?;
    if first.expose_secret() != second.expose_secret() {
        return Err(KeywardError::Config("entries do not match".to_string()));
    }
    Ok(first)
}

fn env_passphrase() -> Option<SecretString> {
    std::env::var(VAULT_KEY_ENV_VAR)
        .ok()
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}
