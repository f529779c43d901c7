//! # Vault Core
//!
//! Role-gated encrypted resource store.
//!
//! ## Architecture
//!
//! - **RBAC**: user → role → permission → resource policy, evaluated fail-closed
//! - **Crypto**: AES-GCM sealing with a fresh nonce per write, plus ephemeral
//!   or passphrase-derived process keys
//! - **Store**: sealed blobs keyed by resource name over a pluggable backend
//! - **Gateway**: the single entry point that checks policy before touching content
//! - **Bootstrap**: assembles a gateway from configuration
//! - **Telemetry**: structured logging and decision/error counters

pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod rbac;
pub mod store;
pub mod telemetry;

pub use error::{ErrorCode, ErrorSeverity, Result, VaultError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bootstrap::open_vault;
    pub use crate::config::{KeySourceKind, VaultConfig};
    pub use crate::crypto::{CipherContext, CipherError, CipherSuite, KeyError, KeySource};
    pub use crate::error::{ErrorCode, ErrorSeverity, Result, VaultError};
    pub use crate::gateway::{AccessGateway, GatewayError};
    pub use crate::rbac::{
        AccessControlEngine, Action, DenyReason, Grant, Policy, PolicyDecision, RoleId, UserId,
    };
    pub use crate::store::{
        BlobBackend, EncryptedResourceStore, FileBackend, InMemoryBackend, StoreError,
    };
}
