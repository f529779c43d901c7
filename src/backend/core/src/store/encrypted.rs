//! Resource store that only ever persists sealed blobs.

use tracing::debug;

use super::{validate_resource_name, BlobBackend, StoreError};
use crate::crypto::{open_bound, seal_bound, CipherContext, SealedBlob};

/// Maps resource names to sealed content held in a [`BlobBackend`].
///
/// Each blob is sealed with its resource name as associated data, so bytes
/// copied from one resource's entry to another's fail authentication.
#[derive(Debug)]
pub struct EncryptedResourceStore<B> {
    backend: B,
}

impl<B: BlobBackend> EncryptedResourceStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Seal `plaintext` and persist it as the new content of `resource`.
    pub fn save(
        &self,
        context: &CipherContext,
        resource: &str,
        plaintext: &str,
    ) -> Result<(), StoreError> {
        validate_resource_name(resource)?;

        let blob = seal_bound(context, plaintext.as_bytes(), resource.as_bytes())?;
        self.backend.put(resource, &blob.to_bytes())?;

        debug!(
            resource,
            backend = self.backend.name(),
            sealed_bytes = blob.len(),
            "Saved sealed resource"
        );
        Ok(())
    }

    /// Load and open the content of `resource`.
    pub fn load(&self, context: &CipherContext, resource: &str) -> Result<String, StoreError> {
        validate_resource_name(resource)?;

        let bytes = self
            .backend
            .get(resource)?
            .ok_or_else(|| StoreError::NotFound(resource.to_string()))?;
        let blob = SealedBlob::from_bytes(&bytes)?;
        let plaintext = open_bound(context, &blob, resource.as_bytes())?;

        debug!(resource, backend = self.backend.name(), "Loaded sealed resource");
        String::from_utf8(plaintext).map_err(|_| StoreError::InvalidText(resource.to_string()))
    }

    /// Whether any content is stored for `resource`.
    pub fn exists(&self, resource: &str) -> Result<bool, StoreError> {
        validate_resource_name(resource)?;
        self.backend.exists(resource)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
