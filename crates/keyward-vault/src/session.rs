// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory session key.
//!
//! A [`SessionContext`] is owned by the caller and passed into every engine
//! operation. Engine calls that change the key take it by `&mut`, so a lock
//! can never interleave with an encrypt or decrypt on the same session.

use std::fmt;

use keyward_core::KeywardError;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::KEY_LEN;

/// A derived key plus the iteration count it was derived with.
pub struct SessionKey {
    key: Zeroizing<[u8; KEY_LEN]>,
    iterations: u32,
}

impl SessionKey {
    pub(crate) fn new(key: Zeroizing<[u8; KEY_LEN]>, iterations: u32) -> Self {
        Self { key, iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("key", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Locked,
    Unlocked(SessionKey),
}

/// Holds at most one session key.
#[derive(Debug, Default)]
pub struct SessionContext {
    state: SessionState,
}

impl SessionContext {
    /// A locked session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, SessionState::Unlocked(_))
    }

    /// Installs `key`, zeroing whatever key was held before.
    pub fn set(&mut self, key: SessionKey) {
        self.clear();
        self.state = SessionState::Unlocked(key);
    }

    /// Zeroes and drops the held key, if any.
    pub fn clear(&mut self) {
        if let SessionState::Unlocked(session_key) = &mut self.state {
            session_key.key.zeroize();
        }
        self.state = SessionState::Locked;
    }

    /// The held key, or [`KeywardError::VaultLocked`].
    pub fn get(&self) -> Result<&SessionKey, KeywardError> {
        match &self.state {
            SessionState::Unlocked(key) => Ok(key),
            SessionState::Locked => Err(KeywardError::VaultLocked),
        }
    }

    /// Iteration count of the held key.
    pub fn iterations(&self) -> Option<u32> {
        self.get().ok().map(SessionKey::iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8, iterations: u32) -> SessionKey {
        SessionKey::new(Zeroizing::new([byte; KEY_LEN]), iterations)
    }

    #[test]
    fn new_session_is_locked() {
        let session = SessionContext::new();
        assert!(!session.is_unlocked());
        assert!(matches!(session.get(), Err(KeywardError::VaultLocked)));
        assert_eq!(session.iterations(), None);
    }

    #[test]
    fn set_replaces_previous_key() {
        let mut session = SessionContext::new();
        session.set(key(1, 100));
        session.set(key(2, 200));
        let held = session.get().unwrap();
        assert_eq!(held.bytes(), &[2u8; KEY_LEN]);
        assert_eq!(held.iterations(), 200);
    }

    #[test]
    fn clear_locks() {
        let mut session = SessionContext::new();
        session.set(key(9, 100));
        session.clear();
        assert!(!session.is_unlocked());
        assert!(session.get().is_err());
        // Clearing twice is harmless.
        session.clear();
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let rendered = format!("{:?}", key(0xAB, 100));
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("171"));
    }
}
