// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TOTP second factor with single-use recovery codes.
//!
//! Codes are RFC 6238 HMAC-SHA1, 6 digits, 30 s steps. The secret and the
//! recovery-code list are sealed under the session key and stored in the
//! vault metadata. When TOTP is off every check returns
//! [`TotpCheck::NotRequired`], never [`TotpCheck::Valid`].

use chrono::Utc;
use data_encoding::BASE32_NOPAD;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keyward_config::model::TotpConfig;
use keyward_core::{KeywardError, TotpCheck, VaultMeta};

use crate::crypto::{self, random_array, Envelope, KEY_LEN};
use crate::meta::VaultMetadataStore;
use crate::session::SessionContext;

/// Secret length in bytes (160 bits).
pub const SECRET_LEN: usize = 20;

/// Digits per code.
pub const CODE_DIGITS: u32 = 6;

/// Time-step length in seconds.
pub const PERIOD_SECS: u64 = 30;

/// Recovery codes issued per setup or regeneration.
pub const RECOVERY_CODE_COUNT: usize = 8;

/// Characters left unescaped in the provisioning URI (RFC 3986 unreserved).
const URI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Material for enrolling an authenticator. Nothing is persisted yet.
pub struct TotpSetup {
    /// Base32 secret, no padding.
    pub secret: SecretString,
    pub provisioning_uri: String,
    pub recovery_codes: Vec<String>,
}

/// The TOTP gate over the vault metadata.
#[derive(Clone)]
pub struct TotpGate {
    metadata: VaultMetadataStore,
    config: TotpConfig,
}

impl TotpGate {
    pub fn new(metadata: VaultMetadataStore, config: TotpConfig) -> Self {
        Self { metadata, config }
    }

    /// Generate a secret, recovery codes and the provisioning URI.
    pub fn init_setup(&self) -> Result<TotpSetup, KeywardError> {
        let raw = Zeroizing::new(random_array::<SECRET_LEN>()?);
        let secret = BASE32_NOPAD.encode(raw.as_ref());
        Ok(TotpSetup {
            provisioning_uri: self.provisioning_uri(&secret),
            secret: SecretString::from(secret),
            recovery_codes: generate_recovery_codes()?,
        })
    }

    /// `otpauth://totp/{issuer}:{account}?secret=...` for authenticator apps.
    pub fn provisioning_uri(&self, secret: &str) -> String {
        let issuer = utf8_percent_encode(&self.config.issuer, URI_ESCAPE).to_string();
        let account = utf8_percent_encode(&self.config.account_name, URI_ESCAPE);
        format!(
            "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}\
             &algorithm=SHA1&digits={CODE_DIGITS}&period={PERIOD_SECS}"
        )
    }

    /// Check a code against a secret that is not stored yet.
    ///
    /// Callers run this on a code from the freshly enrolled authenticator
    /// before calling [`TotpGate::enable`].
    pub fn check_setup_code(&self, secret: &SecretString, code: &str) -> Result<bool, KeywardError> {
        self.check_setup_code_at(secret, code, unix_now())
    }

    pub fn check_setup_code_at(
        &self,
        secret: &SecretString,
        code: &str,
        unix_secs: u64,
    ) -> Result<bool, KeywardError> {
        let raw = decode_secret(secret.expose_secret())?;
        Ok(code_in_window(&raw, code, unix_secs, self.config.skew_steps))
    }

    pub async fn is_enabled(&self) -> Result<bool, KeywardError> {
        Ok(self
            .metadata
            .load()
            .await?
            .is_some_and(|meta| meta.totp_enabled))
    }

    /// Seal and store the secret and recovery codes, and turn TOTP on.
    pub async fn enable(
        &self,
        session: &SessionContext,
        secret: &SecretString,
        recovery_codes: &[String],
    ) -> Result<(), KeywardError> {
        let key = session.get()?;
        decode_secret(secret.expose_secret())?;
        let codes = recovery_codes
            .iter()
            .map(|c| {
                normalize_recovery_code(c)
                    .ok_or_else(|| KeywardError::Crypto(format!("malformed recovery code `{c}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut meta = self.metadata.require().await?;
        meta.totp_secret_encrypted =
            Some(crypto::seal(key.bytes(), secret.expose_secret().as_bytes())?.to_json()?);
        meta.recovery_codes_encrypted = Some(crypto::seal_json(key.bytes(), &codes)?.to_json()?);
        meta.totp_enabled = true;
        self.metadata.save(&mut meta).await?;

        info!(recovery_codes = codes.len(), "two-factor authentication enabled");
        Ok(())
    }

    /// Clear the stored secret, recovery codes and flag.
    pub async fn disable(&self, session: &SessionContext) -> Result<(), KeywardError> {
        session.get()?;
        let mut meta = self.metadata.require().await?;
        meta.clear_totp();
        self.metadata.save(&mut meta).await?;
        info!("two-factor authentication disabled");
        Ok(())
    }

    pub async fn verify_code(
        &self,
        session: &SessionContext,
        code: &str,
    ) -> Result<TotpCheck, KeywardError> {
        self.verify_code_at(session, code, unix_now()).await
    }

    /// Check a code for the step containing `unix_secs`, plus the configured
    /// number of steps on either side.
    pub async fn verify_code_at(
        &self,
        session: &SessionContext,
        code: &str,
        unix_secs: u64,
    ) -> Result<TotpCheck, KeywardError> {
        let Some(meta) = self.enabled_meta().await? else {
            return Ok(TotpCheck::NotRequired);
        };
        let key = session.get()?;
        let secret = open_secret(key.bytes(), &meta)?;

        if code_in_window(&secret, code, unix_secs, self.config.skew_steps) {
            debug!("totp code accepted");
            Ok(TotpCheck::Valid)
        } else {
            debug!("totp code rejected");
            Ok(TotpCheck::Invalid)
        }
    }

    /// Consume a recovery code.
    ///
    /// A match is removed from the stored list before returning `Valid`, so
    /// each code works once. A miss changes nothing.
    pub async fn verify_recovery_code(
        &self,
        session: &SessionContext,
        code: &str,
    ) -> Result<TotpCheck, KeywardError> {
        let Some(mut meta) = self.enabled_meta().await? else {
            return Ok(TotpCheck::NotRequired);
        };
        let key = session.get()?;
        let Some(candidate) = normalize_recovery_code(code) else {
            return Ok(TotpCheck::Invalid);
        };

        let mut codes = open_codes(key.bytes(), &meta)?;
        let Some(position) = codes
            .iter()
            .position(|stored| bool::from(stored.as_bytes().ct_eq(candidate.as_bytes())))
        else {
            return Ok(TotpCheck::Invalid);
        };

        codes.remove(position);
        meta.recovery_codes_encrypted = Some(crypto::seal_json(key.bytes(), &codes)?.to_json()?);
        self.metadata.save(&mut meta).await?;

        if codes.is_empty() {
            warn!("last recovery code used");
        } else {
            info!(remaining = codes.len(), "recovery code used");
        }
        Ok(TotpCheck::Valid)
    }

    /// Unused recovery codes. Zero when TOTP is off.
    pub async fn remaining_recovery_code_count(
        &self,
        session: &SessionContext,
    ) -> Result<usize, KeywardError> {
        let Some(meta) = self.enabled_meta().await? else {
            return Ok(0);
        };
        let key = session.get()?;
        Ok(open_codes(key.bytes(), &meta)?.len())
    }

    /// Replace the whole recovery-code list.
    pub async fn regenerate_recovery_codes(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<String>, KeywardError> {
        let key = session.get()?;
        let mut meta = self
            .enabled_meta()
            .await?
            .ok_or(KeywardError::TotpNotEnabled)?;

        let codes = generate_recovery_codes()?;
        meta.recovery_codes_encrypted = Some(crypto::seal_json(key.bytes(), &codes)?.to_json()?);
        self.metadata.save(&mut meta).await?;

        info!(count = codes.len(), "recovery codes regenerated");
        Ok(codes)
    }

    async fn enabled_meta(&self) -> Result<Option<VaultMeta>, KeywardError> {
        let meta = self.metadata.require().await?;
        Ok(meta.totp_enabled.then_some(meta))
    }
}

fn open_secret(
    key: &[u8; KEY_LEN],
    meta: &VaultMeta,
) -> Result<Zeroizing<Vec<u8>>, KeywardError> {
    let sealed = meta
        .totp_secret_encrypted
        .as_deref()
        .ok_or_else(|| KeywardError::Internal("TOTP enabled without a stored secret".into()))?;
    let encoded = crypto::open(key, &Envelope::from_json(sealed)?)?;
    let encoded = std::str::from_utf8(&encoded)
        .map_err(|_| KeywardError::Crypto("stored TOTP secret is not UTF-8".into()))?;
    decode_secret(encoded)
}

fn open_codes(key: &[u8; KEY_LEN], meta: &VaultMeta) -> Result<Vec<String>, KeywardError> {
    match meta.recovery_codes_encrypted.as_deref() {
        Some(sealed) => crypto::open_json(key, &Envelope::from_json(sealed)?),
        None => Ok(Vec::new()),
    }
}

fn decode_secret(secret: &str) -> Result<Zeroizing<Vec<u8>>, KeywardError> {
    let normalized: String = secret
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map(Zeroizing::new)
        .map_err(|_| KeywardError::Crypto("TOTP secret is not valid base32".into()))
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// RFC 4226 HOTP value for `counter`, truncated to `digits` digits.
pub fn hotp(secret: &[u8], counter: u64, digits: u32) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let mac = tag.as_ref();

    let offset = (mac[mac.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        mac[offset] & 0x7f,
        mac[offset + 1],
        mac[offset + 2],
        mac[offset + 3],
    ]);
    let value = binary % 10u32.pow(digits);
    format!("{value:0width$}", width = digits as usize)
}

/// The 6-digit code for the step containing `unix_secs`.
pub fn generate_code(secret: &[u8], unix_secs: u64) -> String {
    hotp(secret, unix_secs / PERIOD_SECS, CODE_DIGITS)
}

fn code_in_window(secret: &[u8], code: &str, unix_secs: u64, skew_steps: u32) -> bool {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if code.len() != CODE_DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let step = unix_secs / PERIOD_SECS;
    let skew = u64::from(skew_steps);
    let mut matched = false;
    for candidate in step.saturating_sub(skew)..=step.saturating_add(skew) {
        let expected = hotp(secret, candidate, CODE_DIGITS);
        matched |= bool::from(expected.as_bytes().ct_eq(code.as_bytes()));
    }
    matched
}

/// Eight fresh `XXXX-XXXX` codes.
pub fn generate_recovery_codes() -> Result<Vec<String>, KeywardError> {
    (0..RECOVERY_CODE_COUNT)
        .map(|_| {
            let bytes: [u8; 4] = random_array()?;
            let hex = hex::encode_upper(bytes);
            Ok(format!("{}-{}", &hex[..4], &hex[4..]))
        })
        .collect()
}

/// Canonical `XXXX-XXXX` form of user input.
///
/// Non-alphanumerics are dropped and letters uppercased; anything that is not
/// eight characters afterwards is rejected.
pub fn normalize_recovery_code(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (cleaned.len() == 8).then(|| format!("{}-{}", &cleaned[..4], &cleaned[4..]))
}
