//! Per-chunk nonce and associated-data construction.
//!
//! Both values are part of the container format. The nonce is the random
//! 8-byte base from the header followed by the big-endian chunk index, which
//! makes every (key, nonce) pair within a container unique. The associated
//! data binds each chunk to its container (via the header digest) and to its
//! position (via the index).

use crate::config::{AAD_PREFIX, NONCE_BASE_LEN, NONCE_LEN};

/// 12-byte GCM nonce: `base(8) || be32(index)`.
#[inline]
pub fn chunk_nonce(base: &[u8; NONCE_BASE_LEN], index: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..NONCE_BASE_LEN].copy_from_slice(base);
    nonce[NONCE_BASE_LEN..].copy_from_slice(&index.to_be_bytes());
    nonce
}

/// AAD: `"qforge/v1" || SHA-256(header_bytes) || be32(index)`.
pub fn chunk_aad(header_digest: &[u8; 32], index: u32) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_PREFIX.len() + header_digest.len() + 4);
    aad.extend_from_slice(AAD_PREFIX);
    aad.extend_from_slice(header_digest);
    aad.extend_from_slice(&index.to_be_bytes());
    aad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_layout() {
        let nonce = chunk_nonce(&[0xAB; NONCE_BASE_LEN], 0x01020304);

        assert_eq!(&nonce[..8], &[0xAB; 8]);
        assert_eq!(&nonce[8..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_nonce_unique_per_index() {
        let base = [9u8; NONCE_BASE_LEN];
        assert_ne!(chunk_nonce(&base, 0), chunk_nonce(&base, 1));
    }

    #[test]
    fn test_aad_layout() {
        let digest = [0xCD; 32];
        let aad = chunk_aad(&digest, 7);

        assert_eq!(aad.len(), 9 + 32 + 4);
        assert_eq!(&aad[..9], b"qforge/v1");
        assert_eq!(&aad[9..41], &digest);
        assert_eq!(&aad[41..], &7u32.to_be_bytes());
    }
}
