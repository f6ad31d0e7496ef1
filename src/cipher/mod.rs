pub mod aead;
pub mod derive;
pub mod mac;
pub mod nonce;

pub use aead::AesGcm;
pub use derive::{random_bytes, MasterKey};
pub use mac::MacStream;
