//! Authenticated encryption for resource content.
//!
//! Payloads are sealed with AES-GCM under a single process-lifetime key held
//! by a [`CipherContext`]. Every seal draws a fresh 96-bit nonce from the OS
//! RNG and carries it inside the resulting [`SealedBlob`], so a nonce is never
//! reused under the same key.

use aes_gcm::{
    aead::{
        consts::{U12, U16},
        AeadInPlace, KeyInit,
    },
    Aes128Gcm, Aes256Gcm, Nonce, Tag,
};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Nonce size for AES-GCM (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authentication tag size (128 bits).
pub const TAG_LEN: usize = 16;

/// Smallest well-formed serialized blob: nonce plus tag over an empty payload.
pub const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Tag verification failed: the blob was tampered with or sealed under a
    /// different key.
    #[error("Authentication failed: sealed blob was modified or the key does not match")]
    Authentication,

    #[error("Malformed sealed blob: {0}")]
    Decoding(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cipher Suite
// ═══════════════════════════════════════════════════════════════════════════════

/// AEAD algorithm used by a [`CipherContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum CipherSuite {
    #[default]
    #[serde(rename = "aes128-gcm")]
    Aes128Gcm,
    #[serde(rename = "aes256-gcm")]
    Aes256Gcm,
}

impl CipherSuite {
    /// Key length in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128Gcm => "aes128-gcm",
            Self::Aes256Gcm => "aes256-gcm",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sealed Blob
// ═══════════════════════════════════════════════════════════════════════════════

/// One sealed payload: `nonce || ciphertext || tag` once serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl SealedBlob {
    /// Serialize as `nonce || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_BLOB_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse the layout produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() < MIN_BLOB_LEN {
            return Err(CipherError::Decoding(format!(
                "blob is {} bytes, expected at least {}",
                bytes.len(),
                MIN_BLOB_LEN
            )));
        }

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut blob = Self {
            nonce: [0u8; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: [0u8; TAG_LEN],
        };
        blob.nonce.copy_from_slice(nonce);
        blob.tag.copy_from_slice(tag);
        Ok(blob)
    }

    pub fn len(&self) -> usize {
        MIN_BLOB_LEN + self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedBlob")
            .field("nonce", &self.nonce)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cipher Context
// ═══════════════════════════════════════════════════════════════════════════════

enum Engine {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// The process's symmetric key.
///
/// Raw key bytes exist only transiently in zeroizing buffers while the AEAD
/// instance is built; afterwards the key lives inside that instance and is
/// never exposed, printed, or serialized.
pub struct CipherContext {
    suite: CipherSuite,
    engine: Engine,
}

impl CipherContext {
    /// Generate a fresh random key for `suite`.
    pub fn initialize(suite: CipherSuite) -> Result<Self, CipherError> {
        let mut key = Zeroizing::new(vec![0u8; suite.key_len()]);
        getrandom::getrandom(&mut key)
            .map_err(|e| CipherError::KeyGeneration(format!("OS randomness unavailable: {}", e)))?;
        Self::from_key_bytes(suite, &key)
    }

    /// Build a context from caller-supplied key material (e.g. a KDF output).
    pub fn from_key_bytes(suite: CipherSuite, key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != suite.key_len() {
            return Err(CipherError::KeyGeneration(format!(
                "{} requires a {}-byte key, got {}",
                suite,
                suite.key_len(),
                key.len()
            )));
        }

        let engine = match suite {
            CipherSuite::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map(|cipher| Engine::Aes128(Box::new(cipher))),
            CipherSuite::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map(|cipher| Engine::Aes256(Box::new(cipher))),
        }
        .map_err(|_| CipherError::KeyGeneration("invalid key length".to_string()))?;

        Ok(Self { suite, engine })
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    fn encrypt_detached(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        buffer: &mut [u8],
    ) -> Result<Tag, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        match &self.engine {
            Engine::Aes128(cipher) => cipher.encrypt_in_place_detached(nonce, aad, buffer),
            Engine::Aes256(cipher) => cipher.encrypt_in_place_detached(nonce, aad, buffer),
        }
    }

    fn decrypt_detached(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<(), aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        let tag = Tag::<U16>::from_slice(tag);
        match &self.engine {
            Engine::Aes128(cipher) => cipher.decrypt_in_place_detached(nonce, aad, buffer, tag),
            Engine::Aes256(cipher) => cipher.decrypt_in_place_detached(nonce, aad, buffer, tag),
        }
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext")
            .field("suite", &self.suite)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Seal / Open
// ═══════════════════════════════════════════════════════════════════════════════

/// Seal `plaintext` under a fresh random nonce.
pub fn seal(context: &CipherContext, plaintext: &[u8]) -> Result<SealedBlob, CipherError> {
    seal_bound(context, plaintext, &[])
}

/// Open a blob produced by [`seal`].
pub fn open(context: &CipherContext, blob: &SealedBlob) -> Result<Vec<u8>, CipherError> {
    open_bound(context, blob, &[])
}

/// Seal `plaintext`, authenticating `associated_data` alongside it.
///
/// The associated data is not stored in the blob; the same bytes must be
/// supplied to [`open_bound`].
pub fn seal_bound(
    context: &CipherContext,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<SealedBlob, CipherError> {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| CipherError::Encryption(format!("OS randomness unavailable: {}", e)))?;

    let mut ciphertext = plaintext.to_vec();
    let tag = context
        .encrypt_detached(&nonce, associated_data, &mut ciphertext)
        .map_err(|_| CipherError::Encryption("payload exceeds AES-GCM limits".to_string()))?;

    let mut blob = SealedBlob {
        nonce,
        ciphertext,
        tag: [0u8; TAG_LEN],
    };
    blob.tag.copy_from_slice(&tag);
    Ok(blob)
}

/// Verify and decrypt a blob sealed with [`seal_bound`].
///
/// On failure the working buffer is wiped and no plaintext is returned.
pub fn open_bound(
    context: &CipherContext,
    blob: &SealedBlob,
    associated_data: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut buffer = Zeroizing::new(blob.ciphertext.clone());
    context
        .decrypt_detached(&blob.nonce, associated_data, &mut buffer, &blob.tag)
        .map_err(|_| CipherError::Authentication)?;
    Ok(std::mem::take(&mut *buffer))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
