//! Key establishment.
//!
//! A [`KeySource`] decides where the process key comes from:
//!
//! - [`KeySource::Ephemeral`]: a random key that dies with the process.
//!   Content sealed under it cannot be opened by any later run.
//! - [`KeySource::Passphrase`]: an Argon2id key derived from a passphrase
//!   and a random salt kept in the backend. The same passphrase reopens the
//!   same content across runs; a key-check blob rejects a wrong passphrase
//!   up front.
//!
//! The key itself is never written anywhere.

use argon2::Argon2;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::cipher::{open_bound, seal_bound, CipherContext, CipherError, CipherSuite, SealedBlob};
use crate::store::{BlobBackend, StoreError};

/// Backend entry holding the KDF salt.
pub const SALT_ENTRY: &str = ".salt";

/// Backend entry holding the sealed key-check marker.
pub const KEY_CHECK_ENTRY: &str = ".keycheck";

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

const KEY_CHECK_MARKER: &[u8] = b"vault-key-check-v1";

/// Errors from key establishment.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("Key material storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Passphrase does not match the one this store was created with")]
    PassphraseMismatch,

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Stored salt is corrupt: {0} bytes")]
    CorruptSalt(usize),
}

/// Where the process key comes from.
#[derive(Clone)]
pub enum KeySource {
    Ephemeral,
    Passphrase(Zeroizing<String>),
}

impl KeySource {
    pub fn passphrase(secret: impl Into<String>) -> Self {
        Self::Passphrase(Zeroizing::new(secret.into()))
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => f.write_str("Ephemeral"),
            Self::Passphrase(_) => f.write_str("Passphrase([REDACTED])"),
        }
    }
}

/// Produce the process [`CipherContext`] for `source`.
///
/// For passphrase keys the salt and key-check entries are created in
/// `backend` on first use and verified on every later call.
pub fn establish<B: BlobBackend + ?Sized>(
    source: &KeySource,
    suite: CipherSuite,
    backend: &B,
) -> Result<CipherContext, KeyError> {
    match source {
        KeySource::Ephemeral => {
            warn!(
                suite = %suite,
                backend = backend.name(),
                "Using an ephemeral key; stored content will be unreadable after this process exits"
            );
            Ok(CipherContext::initialize(suite)?)
        }
        KeySource::Passphrase(passphrase) => {
            let salt = load_or_create_salt(backend)?;
            let context = derive_context(passphrase.as_bytes(), &salt, suite)?;
            verify_or_record_key_check(&context, backend)?;
            info!(suite = %suite, "Established passphrase-derived key");
            Ok(context)
        }
    }
}

/// Derive a context from `passphrase` and `salt` with Argon2id.
pub fn derive_context(
    passphrase: &[u8],
    salt: &[u8],
    suite: CipherSuite,
) -> Result<CipherContext, KeyError> {
    let mut key = Zeroizing::new(vec![0u8; suite.key_len()]);
    Argon2::default()
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| KeyError::Derivation(e.to_string()))?;
    Ok(CipherContext::from_key_bytes(suite, &key)?)
}

fn load_or_create_salt<B: BlobBackend + ?Sized>(backend: &B) -> Result<Vec<u8>, KeyError> {
    if let Some(salt) = backend.get(SALT_ENTRY)? {
        return checked_salt(salt);
    }

    let mut salt = vec![0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| CipherError::KeyGeneration(format!("OS randomness unavailable: {}", e)))?;

    if backend.put_new(SALT_ENTRY, &salt)? {
        info!(backend = backend.name(), "Created key derivation salt");
        return Ok(salt);
    }

    // Another process created the salt between our read and write.
    let salt = backend
        .get(SALT_ENTRY)?
        .ok_or_else(|| StoreError::NotFound(SALT_ENTRY.to_string()))?;
    checked_salt(salt)
}

fn checked_salt(salt: Vec<u8>) -> Result<Vec<u8>, KeyError> {
    if salt.len() != SALT_LEN {
        return Err(KeyError::CorruptSalt(salt.len()));
    }
    Ok(salt)
}

fn verify_or_record_key_check<B: BlobBackend + ?Sized>(
    context: &CipherContext,
    backend: &B,
) -> Result<(), KeyError> {
    let aad = KEY_CHECK_ENTRY.as_bytes();

    let bytes = match backend.get(KEY_CHECK_ENTRY)? {
        Some(bytes) => bytes,
        None => {
            let blob = seal_bound(context, KEY_CHECK_MARKER, aad)?;
            if backend.put_new(KEY_CHECK_ENTRY, &blob.to_bytes())? {
                return Ok(());
            }
            backend
                .get(KEY_CHECK_ENTRY)?
                .ok_or_else(|| StoreError::NotFound(KEY_CHECK_ENTRY.to_string()))?
        }
    };

    let blob = SealedBlob::from_bytes(&bytes)?;
    match open_bound(context, &blob, aad) {
        Ok(marker) if marker == KEY_CHECK_MARKER => Ok(()),
        Ok(_) | Err(CipherError::Authentication) => Err(KeyError::PassphraseMismatch),
        Err(e) => Err(e.into()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
