//! Key derivation and random material.
//!
//! The master key is derived from the passphrase and the header salt with
//! Argon2id. The MAC subkey is a SHA-256 of a fixed label and the master
//! key, so the AEAD and the container MAC never share a key.

use std::fmt::{Debug, Formatter};

use argon2::Algorithm::Argon2id;
use argon2::Version::V0x13;
use argon2::{Argon2, Params};
use rand::rand_core::{OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::config::{ARGON_MEMORY, ARGON_THREADS, ARGON_TIME, KEY_LEN, MAC_KEY_LABEL, MAC_LEN, SALT_LEN};
use crate::error::{EngineError, Result};
use crate::secret::Secret;

/// The derived 32-byte symmetric key. Never persisted; scrubbed on drop.
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Derives the master key with Argon2id.
    ///
    /// The parameters are format constants: any change produces a key that
    /// cannot open existing containers.
    pub fn derive(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(EngineError::Config("empty passphrase".into()));
        }

        let params = Params::new(ARGON_MEMORY, ARGON_TIME, ARGON_THREADS, Some(KEY_LEN))
            .map_err(|e| EngineError::Crypto(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Argon2id, V0x13, params);

        let mut bytes = [0u8; KEY_LEN];
        argon2
            .hash_password_into(passphrase, salt, &mut bytes)
            .map_err(|e| EngineError::Crypto(format!("key derivation failed: {e}")))?;

        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derives the MAC subkey: `SHA-256(label || K)`.
    pub fn mac_key(&self) -> Secret<[u8; MAC_LEN]> {
        let mut hasher = Sha256::new();
        hasher.update(MAC_KEY_LABEL);
        hasher.update(self.bytes);
        Secret::new(hasher.finalize().into())
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl Debug for MasterKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Fills an array from the operating system's secure random source.
#[inline]
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EngineError::Crypto(format!("rng failed: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = MasterKey::derive(b"passphrase", &salt).unwrap();
        let b = MasterKey::derive(b"passphrase", &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_derive_varies_with_salt() {
        let a = MasterKey::derive(b"passphrase", &[0u8; SALT_LEN]).unwrap();
        let b = MasterKey::derive(b"passphrase", &[1u8; SALT_LEN]).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_derive_rejects_empty_passphrase() {
        assert!(matches!(
            MasterKey::derive(b"", &[0u8; SALT_LEN]),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_mac_key_differs_from_master_key() {
        let key = MasterKey::derive(b"passphrase", &[3u8; SALT_LEN]).unwrap();
        assert_ne!(key.mac_key().expose(), key.as_bytes());
    }

    #[test]
    fn test_random_bytes_not_constant() {
        let a = random_bytes::<16>().unwrap();
        let b = random_bytes::<16>().unwrap();
        assert_ne!(a, b);
    }
}
