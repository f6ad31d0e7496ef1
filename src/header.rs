//! Container header codec.
//!
//! The header is a fixed 33-byte preamble: magic, format version, salt,
//! nonce base, and the plaintext chunk size as a little-endian u32. The raw
//! serialized bytes are kept alongside the parsed fields because the MAC
//! stream and the per-chunk associated data both need them verbatim.

use std::io::{ErrorKind, Read};

use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::config::{FORMAT_VERSION, HEADER_LEN, MAGIC, MAX_CHUNK_SIZE, NONCE_BASE_LEN, SALT_LEN};
use crate::error::{EngineError, Result};

pub struct Header {
    salt: [u8; SALT_LEN],
    nonce_base: [u8; NONCE_BASE_LEN],
    chunk_size: u32,
    raw: [u8; HEADER_LEN],
}

impl Header {
    /// Builds a header and its serialized form in one step.
    pub fn new(salt: [u8; SALT_LEN], nonce_base: [u8; NONCE_BASE_LEN], chunk_size: u32) -> Self {
        let mut raw = [0u8; HEADER_LEN];
        raw[..4].copy_from_slice(&MAGIC);
        raw[4] = FORMAT_VERSION;
        raw[5..5 + SALT_LEN].copy_from_slice(&salt);
        raw[21..21 + NONCE_BASE_LEN].copy_from_slice(&nonce_base);
        LittleEndian::write_u32(&mut raw[29..], chunk_size);

        Self { salt, nonce_base, chunk_size, raw }
    }

    /// Parses a serialized header, validating magic, version, and chunk size.
    pub fn parse(raw: [u8; HEADER_LEN]) -> Result<Self> {
        if raw[..4] != MAGIC {
            return Err(EngineError::BadHeader("wrong magic"));
        }
        if raw[4] != FORMAT_VERSION {
            return Err(EngineError::BadHeader("unsupported version"));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[5..5 + SALT_LEN]);
        let mut nonce_base = [0u8; NONCE_BASE_LEN];
        nonce_base.copy_from_slice(&raw[21..21 + NONCE_BASE_LEN]);
        let chunk_size = LittleEndian::read_u32(&raw[29..]);

        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(EngineError::BadHeader("chunk size out of range"));
        }

        Ok(Self { salt, nonce_base, chunk_size, raw })
    }

    /// Reads and parses a header from the start of a container.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; HEADER_LEN];
        reader.read_exact(&mut raw).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => EngineError::BadHeader("short header"),
            _ => EngineError::Io(e),
        })?;

        Self::parse(raw)
    }

    #[inline]
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    #[inline]
    pub fn nonce_base(&self) -> &[u8; NONCE_BASE_LEN] {
        &self.nonce_base
    }

    #[inline]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// The exact serialized bytes, as written to (or read from) the file.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.raw
    }

    /// SHA-256 of the serialized header. Bound into every chunk's associated
    /// data so a chunk cannot be replayed into a different container.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.raw).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header::new([0x11; SALT_LEN], [0x22; NONCE_BASE_LEN], 4096)
    }

    #[test]
    fn test_layout() {
        let header = sample();
        let raw = header.as_bytes();

        assert_eq!(raw.len(), 33);
        assert_eq!(&raw[..4], b"QFGE");
        assert_eq!(raw[4], 1);
        assert_eq!(&raw[5..21], &[0x11; 16]);
        assert_eq!(&raw[21..29], &[0x22; 8]);
        assert_eq!(&raw[29..], &4096u32.to_le_bytes());
    }

    #[test]
    fn test_parse_roundtrip() {
        let header = sample();
        let parsed = Header::parse(*header.as_bytes()).unwrap();

        assert_eq!(parsed.salt(), header.salt());
        assert_eq!(parsed.nonce_base(), header.nonce_base());
        assert_eq!(parsed.chunk_size(), 4096);
        assert_eq!(parsed.as_bytes(), header.as_bytes());
        assert_eq!(parsed.digest(), header.digest());
    }

    #[test]
    fn test_parse_rejects_wrong_magic() {
        let mut raw = *sample().as_bytes();
        raw[0] = b'X';
        assert!(matches!(Header::parse(raw), Err(EngineError::BadHeader(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let mut raw = *sample().as_bytes();
        raw[4] = 2;
        assert!(matches!(Header::parse(raw), Err(EngineError::BadHeader(_))));
    }

    #[test]
    fn test_parse_rejects_chunk_size_out_of_range() {
        let zero = *Header::new([0; SALT_LEN], [0; NONCE_BASE_LEN], 0).as_bytes();
        assert!(matches!(Header::parse(zero), Err(EngineError::BadHeader(_))));

        let huge = *Header::new([0; SALT_LEN], [0; NONCE_BASE_LEN], MAX_CHUNK_SIZE + 1).as_bytes();
        assert!(matches!(Header::parse(huge), Err(EngineError::BadHeader(_))));
    }

    #[test]
    fn test_read_from_short_input() {
        let mut short: &[u8] = &[0u8; 10];
        assert!(matches!(Header::read_from(&mut short), Err(EngineError::BadHeader(_))));
    }
}
