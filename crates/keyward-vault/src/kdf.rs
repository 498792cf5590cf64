// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation and the password verification hash.
//!
//! The verification hash is `base64(sha256(key))`. It lets a password be
//! checked without decrypting any record, and is compared in constant time.

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keyward_core::KeywardError;
use ring::{digest, pbkdf2};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::{random_array, KEY_LEN};

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// Derive a 32-byte key from `password` and `salt`.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KeywardError> {
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| KeywardError::Crypto("PBKDF2 iteration count must be non-zero".into()))?;

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password,
        output.as_mut(),
    );
    Ok(output)
}

/// Run [`derive_key`] on the blocking thread pool.
///
/// Derivation at the strong iteration count takes long enough to stall an
/// async executor, so every engine path goes through here.
pub async fn derive_key_blocking(
    password: &SecretString,
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, KeywardError> {
    let password = Zeroizing::new(password.expose_secret().as_bytes().to_vec());
    let salt = salt.to_vec();
    tokio::task::spawn_blocking(move || derive_key(&password, &salt, iterations))
        .await
        .map_err(|e| KeywardError::Internal(format!("key derivation task failed: {e}")))?
}

/// `base64(sha256(key))`.
pub fn verification_hash(key: &[u8; KEY_LEN]) -> String {
    STANDARD.encode(digest::digest(&digest::SHA256, key))
}

/// Constant-time comparison of a derived key against a stored verification hash.
///
/// A stored hash that is not valid base64 never matches.
pub fn matches_verification_hash(key: &[u8; KEY_LEN], stored: &str) -> bool {
    let Ok(stored) = STANDARD.decode(stored.as_bytes()) else {
        return false;
    };
    let computed = digest::digest(&digest::SHA256, key);
    computed.as_ref().ct_eq(stored.as_slice()).into()
}

/// Derive the key for `password` and keep it only if it matches `stored_hash`.
pub async fn derive_and_verify(
    password: &SecretString,
    salt: &[u8],
    stored_hash: &str,
    iterations: u32,
) -> Result<Option<Zeroizing<[u8; KEY_LEN]>>, KeywardError> {
    let key = derive_key_blocking(password, salt, iterations).await?;
    Ok(matches_verification_hash(&key, stored_hash).then_some(key))
}

/// Whether `password` derives a key matching `stored_hash`.
pub async fn verify_password(
    password: &SecretString,
    salt: &[u8],
    stored_hash: &str,
    iterations: u32,
) -> Result<bool, KeywardError> {
    Ok(derive_and_verify(password, salt, stored_hash, iterations)
        .await?
        .is_some())
}

/// Generate a random 32-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], KeywardError> {
    random_array()
}

/// Base64 form stored in the vault metadata.
pub fn encode_salt(salt: &[u8]) -> String {
    STANDARD.encode(salt)
}

/// Decode a stored salt.
pub fn decode_salt(encoded: &str) -> Result<Vec<u8>, KeywardError> {
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| KeywardError::Crypto(format!("stored salt is not valid base64: {e}")))
}
