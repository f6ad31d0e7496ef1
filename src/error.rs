//! Engine error taxonomy.
//!
//! Every failure the engine can produce maps to one of these kinds. The
//! first error observed by any pipeline party cancels the run and is the one
//! returned; later errors are discarded.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad header: {0}")]
    BadHeader(&'static str),

    #[error("bad record: {0}")]
    BadRecord(String),

    /// Deliberately generic: the caller is not told which chunk failed, or
    /// whether the chunk authentication or the container MAC rejected.
    #[error("verification failed: file may be corrupted or tampered with")]
    AuthFailure,

    #[error("input too large: chunk counter would wrap the nonce space")]
    NonceWouldWrap,

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
