//! Streaming container MAC.
//!
//! HMAC-SHA256 over the raw header bytes followed by every record frame
//! (length prefix then ciphertext) in ascending index order. The order is
//! the invariant: the encrypt collector and the decrypt reader both feed
//! this stream strictly in index order regardless of worker completion
//! order.

use hmac::{Hmac, Mac as _};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::cipher::derive::MasterKey;
use crate::config::MAC_LEN;
use crate::error::{EngineError, Result};

pub struct MacStream {
    inner: Hmac<Sha256>,
}

impl MacStream {
    /// Initializes the stream with the MAC subkey derived from the master
    /// key. The subkey is scrubbed before this returns.
    pub fn new(key: &MasterKey) -> Result<Self> {
        let mac_key = key.mac_key();
        let inner = Hmac::<Sha256>::new_from_slice(mac_key.expose())
            .map_err(|e| EngineError::Crypto(format!("hmac init: {e}")))?;
        Ok(Self { inner })
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finalizes the stream into the 32-byte tag written at the container
    /// tail.
    pub fn finalize(self) -> [u8; MAC_LEN] {
        self.inner.finalize().into_bytes().into()
    }

    /// Compares the stored tag against the computed one in constant time.
    pub fn verify(self, stored: &[u8; MAC_LEN]) -> Result<()> {
        let computed = self.finalize();
        if bool::from(stored.ct_eq(&computed)) {
            Ok(())
        } else {
            Err(EngineError::AuthFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SALT_LEN;

    fn key() -> MasterKey {
        MasterKey::derive(b"mac test passphrase", &[6u8; SALT_LEN]).unwrap()
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let key = key();

        let mut split = MacStream::new(&key).unwrap();
        split.update(b"head");
        split.update(b"er bytes");
        split.update(b" and records");

        let mut whole = MacStream::new(&key).unwrap();
        whole.update(b"header bytes and records");

        assert_eq!(split.finalize(), whole.finalize());
    }

    #[test]
    fn test_verify_accepts_own_tag() {
        let key = key();

        let mut a = MacStream::new(&key).unwrap();
        a.update(b"container");
        let tag = a.finalize();

        let mut b = MacStream::new(&key).unwrap();
        b.update(b"container");
        assert!(b.verify(&tag).is_ok());
    }

    #[test]
    fn test_verify_rejects_flipped_tag() {
        let key = key();

        let mut a = MacStream::new(&key).unwrap();
        a.update(b"container");
        let mut tag = a.finalize();
        tag[0] ^= 0x01;

        let mut b = MacStream::new(&key).unwrap();
        b.update(b"container");
        assert!(matches!(b.verify(&tag), Err(EngineError::AuthFailure)));
    }

    #[test]
    fn test_verify_rejects_different_stream() {
        let key = key();

        let mut a = MacStream::new(&key).unwrap();
        a.update(b"one");
        let tag = a.finalize();

        let mut b = MacStream::new(&key).unwrap();
        b.update(b"two");
        assert!(b.verify(&tag).is_err());
    }
}
