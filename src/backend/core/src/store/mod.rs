//! Encrypted resource storage.
//!
//! - **Backends**: raw blob persistence ([`FileBackend`], [`InMemoryBackend`])
//! - **Encrypted store**: seals content before it reaches a backend and opens it on the way back

pub mod backend;
pub mod encrypted;

pub use backend::{BlobBackend, FileBackend, InMemoryBackend, BLOB_EXTENSION, FILE_NAME_MAX};
pub use encrypted::EncryptedResourceStore;

use thiserror::Error;

use crate::crypto::CipherError;

/// Longest accepted resource name, in bytes: the on-disk `<name>.bin` must
/// still fit in [`FILE_NAME_MAX`].
pub const MAX_RESOURCE_NAME_LEN: usize = FILE_NAME_MAX - BLOB_EXTENSION.len() - 1;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No stored content for resource: {0}")]
    NotFound(String),

    #[error("Invalid resource name {name:?}: {reason}")]
    InvalidResourceName { name: String, reason: &'static str },

    #[error("Storage I/O failed for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("Stored content for {0} is not valid UTF-8")]
    InvalidText(String),
}

impl StoreError {
    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        Self::Io {
            name: name.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Cipher(CipherError::Authentication))
    }
}

/// Check that a resource name can be used as a storage entry.
///
/// Names must be non-empty, at most [`MAX_RESOURCE_NAME_LEN`] bytes, free of
/// path separators and NUL, and must not start with `.` (that prefix is
/// reserved for key-management entries).
pub fn validate_resource_name(name: &str) -> Result<(), StoreError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.len() > MAX_RESOURCE_NAME_LEN {
        Some("name is too long")
    } else if name.starts_with('.') {
        Some("names starting with '.' are reserved")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name contains a path separator or NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidResourceName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["report.txt", "notes", "a b c.md", "UPPER-case_1.bin"] {
            assert!(validate_resource_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejected_names() {
        let long = "x".repeat(MAX_RESOURCE_NAME_LEN + 1);
        for name in ["", ".salt", "..", "../etc/passwd", "dir/file", "dir\\file", "nul\0", &long] {
            let err = validate_resource_name(name).unwrap_err();
            assert!(matches!(err, StoreError::InvalidResourceName { .. }), "{name:?}");
        }
    }

    #[test]
    fn test_name_length_boundary() {
        assert_eq!(MAX_RESOURCE_NAME_LEN, 251);
        assert!(validate_resource_name(&"a".repeat(MAX_RESOURCE_NAME_LEN)).is_ok());

        let err = validate_resource_name(&"a".repeat(MAX_RESOURCE_NAME_LEN + 1)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidResourceName { .. }));
    }

    #[test]
    fn test_error_predicates() {
        assert!(StoreError::NotFound("a".into()).is_not_found());
        assert!(StoreError::Cipher(CipherError::Authentication).is_authentication_failure());
        assert!(!StoreError::Cipher(CipherError::Decoding("short".into())).is_authentication_failure());
    }
}
