//! AES-256-GCM with caller-supplied nonces and associated data.
//!
//! The engine derives every nonce from the header's nonce base and the chunk
//! index, so unlike a general-purpose wrapper this one never generates
//! nonces and never prepends them to the ciphertext.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::cipher::derive::MasterKey;
use crate::config::NONCE_LEN;
use crate::error::{EngineError, Result};

pub struct AesGcm {
    cipher: Aes256Gcm,
}

impl AesGcm {
    pub fn new(key: &MasterKey) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| EngineError::Crypto(format!("aes-gcm init: {e}")))?;
        Ok(Self { cipher })
    }

    /// Encrypts one chunk. Output is `plaintext.len() + 16` bytes.
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|_| EngineError::Crypto("aes-gcm seal failed".into()))
    }

    /// Decrypts and authenticates one chunk. Rejection is reported as the
    /// generic `AuthFailure`; callers log the chunk index at debug level
    /// only.
    pub fn open(&self, nonce: &[u8; NONCE_LEN], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| EngineError::AuthFailure)
    }
}
