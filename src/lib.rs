//! qforge - chunked authenticated file encryption.
//!
//! A streaming file encryption tool that turns a regular file into a
//! self-describing ciphertext container and back:
//! - AES-256-GCM per chunk, with the nonce bound to the chunk index
//! - Argon2id for key derivation
//! - HMAC-SHA256 over the whole container (header and every record)
//! - parallel seal/open across CPU cores using positioned writes

pub mod allocator;
pub mod cipher;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod options;
pub mod secret;
