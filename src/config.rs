//! Global configuration constants.
//!
//! Everything that defines the container format or tunes the pipeline lives
//! here. The format constants (magic, header layout, nonce construction,
//! Argon2 parameters) are load-bearing: changing any of them makes existing
//! containers unreadable.

/// Magic bytes identifying a qforge container.
pub const MAGIC: [u8; 4] = *b"QFGE";

/// Current container format version.
pub const FORMAT_VERSION: u8 = 1;

/// File extension appended to encrypted output paths.
pub const ENCRYPTED_EXTENSION: &str = ".enc";

/// Suffix of the temporary sibling file written before the atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Environment variable the passphrase is read from.
pub const PASSPHRASE_ENV: &str = "QFORGE_PASSPHRASE";

// === Header layout ===

/// Length of the salt stored in the header.
pub const SALT_LEN: usize = 16;

/// Length of the random nonce base stored in the header.
pub const NONCE_BASE_LEN: usize = 8;

/// Serialized header length: magic + version + salt + nonce base + chunk size.
pub const HEADER_LEN: usize = 4 + 1 + SALT_LEN + NONCE_BASE_LEN + 4;

// === Cryptographic sizes ===

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length: the 8-byte nonce base followed by the big-endian
/// 32-bit chunk index.
pub const NONCE_LEN: usize = NONCE_BASE_LEN + 4;

/// AES-GCM authentication tag length appended to each chunk's ciphertext.
pub const TAG_LEN: usize = 16;

/// Length of the HMAC-SHA256 tag trailing the container.
pub const MAC_LEN: usize = 32;

/// Domain-separation label prefixed to every chunk's associated data.
pub const AAD_PREFIX: &[u8] = b"qforge/v1";

/// Label hashed with the master key to derive the MAC subkey.
pub const MAC_KEY_LABEL: &[u8] = b"hmac";

// === Argon2id key derivation parameters ===
// Chosen to resist GPU attacks while staying usable on typical hardware.
// These are baked into the format: a container encrypted with them can only
// be opened with the exact same parameters.

/// Argon2 time cost (iterations).
pub const ARGON_TIME: u32 = 3;

/// Argon2 memory cost in KiB (64 MiB).
pub const ARGON_MEMORY: u32 = 64 * 1024;

/// Argon2 parallelism (lanes).
pub const ARGON_THREADS: u32 = 4;

// === Chunking and pipeline tuning ===

/// Smallest chunk size the auto-tuner will pick.
pub const MIN_CHUNK_SIZE: u32 = 256 * 1024;

/// Largest chunk size accepted anywhere, including from file headers.
pub const MAX_CHUNK_SIZE: u32 = 16 * 1024 * 1024;

/// Chunk size used when the input size cannot be determined.
pub const DEFAULT_CHUNK_SIZE: u32 = MAX_CHUNK_SIZE;

/// Auto-tuned chunk sizes are rounded up to a multiple of this. Filesystems
/// that extend files in clusters benefit from the alignment.
pub const CHUNK_ALIGN: u32 = 64 * 1024;

/// The auto-tuner aims for roughly this many chunks per worker.
pub const TARGET_CHUNKS_PER_WORKER: u64 = 32;

/// During decryption the output is pre-grown every this many chunks...
pub const PREALLOC_STRIDE: u32 = 1024;

/// ...to this many chunks ahead of the reader. Best effort only; overshoot
/// is truncated away at finalization.
pub const PREALLOC_AHEAD: u64 = 1024;
