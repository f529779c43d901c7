//! Authenticated encryption and key management.
//!
//! - **Cipher**: AES-GCM seal/open with a fresh nonce per seal
//! - **Keys**: ephemeral or passphrase-derived process keys

pub mod cipher;
pub mod keys;

pub use cipher::{
    open, open_bound, seal, seal_bound, CipherContext, CipherError, CipherSuite, SealedBlob,
    MIN_BLOB_LEN, NONCE_LEN, TAG_LEN,
};
pub use keys::{derive_context, establish, KeyError, KeySource};
