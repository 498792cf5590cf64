// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelope seal/open.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keyward_core::KeywardError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Output of authenticated encryption: nonce, ciphertext and tag.
///
/// Persisted as `{"nonce": b64, "ciphertext": b64, "tag": b64}`. An envelope
/// carries no key material and is only meaningful with the key that sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "b64_fixed")]
    pub nonce: [u8; NONCE_LEN],
    #[serde(with = "b64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64_fixed")]
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Encodes the envelope as its persisted JSON form.
    pub fn to_json(&self) -> Result<String, KeywardError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the persisted JSON form.
    pub fn from_json(json: &str) -> Result<Self, KeywardError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, KeywardError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KeywardError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Envelope, KeywardError> {
    let key = aead_key(key)?;
    let nonce_bytes: [u8; NONCE_LEN] = random_array()?;

    let mut ciphertext = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| KeywardError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    let tag: [u8; TAG_LEN] = tag
        .as_ref()
        .try_into()
        .map_err(|_| KeywardError::Crypto("unexpected GCM tag length".to_string()))?;

    Ok(Envelope {
        nonce: nonce_bytes,
        ciphertext,
        tag,
    })
}

/// Decrypt an envelope.
///
/// Fails with [`KeywardError::AuthenticationFailed`] when the tag does not
/// verify; no partial plaintext is ever returned.
pub fn open(key: &[u8; KEY_LEN], envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>, KeywardError> {
    let key = aead_key(key)?;

    let mut in_out = Zeroizing::new(Vec::with_capacity(envelope.ciphertext.len() + TAG_LEN));
    in_out.extend_from_slice(&envelope.ciphertext);
    in_out.extend_from_slice(&envelope.tag);

    let plaintext_len = key
        .open_in_place(
            Nonce::assume_unique_for_key(envelope.nonce),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| KeywardError::AuthenticationFailed)?
        .len();

    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// Serialize `value` to JSON and seal it.
pub fn seal_json<T: Serialize>(key: &[u8; KEY_LEN], value: &T) -> Result<Envelope, KeywardError> {
    let json = Zeroizing::new(serde_json::to_vec(value)?);
    seal(key, &json)
}

/// Open an envelope and deserialize its JSON payload.
pub fn open_json<T: DeserializeOwned>(
    key: &[u8; KEY_LEN],
    envelope: &Envelope,
) -> Result<T, KeywardError> {
    let plaintext = open(key, envelope)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Fill a fixed-size array from the system CSPRNG.
pub fn random_array<const N: usize>() -> Result<[u8; N], KeywardError> {
    let mut out = [0u8; N];
    SystemRandom::new()
        .fill(&mut out)
        .map_err(|_| KeywardError::Crypto("system random generator failed".to_string()))?;
    Ok(out)
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_LEN]>, KeywardError> {
    Ok(Zeroizing::new(random_array()?))
}

mod b64_fixed {
    use super::{Engine, STANDARD};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let decoded = STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)?;
        let len = decoded.len();
        decoded
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

mod b64_bytes {
    use super::{Engine, STANDARD};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}
