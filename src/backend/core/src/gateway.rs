//! Access gateway: the single entry point that couples authorization to
//! content access.
//!
//! Callers (the command loop) only ever talk to [`AccessGateway`]; the engine,
//! cipher context and store stay private to it.

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crypto::CipherContext;
use crate::rbac::{AccessControlEngine, Action, DenyReason, Grant, PolicyDecision, RoleId};
use crate::store::{BlobBackend, EncryptedResourceStore, StoreError};
use crate::telemetry::ACCESS_DECISIONS_TOTAL;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a refused or failed gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The policy does not grant the action. An ordinary outcome, not a fault.
    #[error("Access denied: user '{user}' may not {action} '{resource}'")]
    AccessDenied {
        user: String,
        resource: String,
        action: String,
        reason: DenyReason,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gateway
// ═══════════════════════════════════════════════════════════════════════════════

/// Orchestrates policy checks and encrypted storage for one process.
#[derive(Debug)]
pub struct AccessGateway<B> {
    engine: AccessControlEngine,
    store: EncryptedResourceStore<B>,
    context: CipherContext,
}

impl<B: BlobBackend> AccessGateway<B> {
    pub fn new(
        engine: AccessControlEngine,
        store: EncryptedResourceStore<B>,
        context: CipherContext,
    ) -> Self {
        Self {
            engine,
            store,
            context,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_valid_user(&self, username: &str) -> bool {
        self.engine.is_valid_user(username)
    }

    pub fn role_of(&self, username: &str) -> Option<&RoleId> {
        self.engine.role_of(username)
    }

    pub fn can_perform(&self, username: &str, resource: &str, action: &str) -> bool {
        self.engine.can_perform(username, resource, action)
    }

    /// Effective `(action, resource)` grants for `username`.
    pub fn grants(&self, username: &str) -> Vec<Grant> {
        self.engine.grants(username)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content access
    // ─────────────────────────────────────────────────────────────────────────

    /// Return the plaintext of `resource` if `username` may read it.
    pub fn read_resource(&self, username: &str, resource: &str) -> Result<String, GatewayError> {
        self.authorize(username, resource, Action::READ)?;
        let content = self.store.load(&self.context, resource)?;
        info!(user = username, resource, "Resource read");
        Ok(content)
    }

    /// Replace the content of `resource` if `username` may write it.
    ///
    /// Storage is untouched when access is denied.
    pub fn write_resource(
        &self,
        username: &str,
        resource: &str,
        content: &str,
    ) -> Result<(), GatewayError> {
        self.authorize(username, resource, Action::WRITE)?;
        self.store.save(&self.context, resource, content)?;
        info!(user = username, resource, bytes = content.len(), "Resource written");
        Ok(())
    }

    fn authorize(&self, username: &str, resource: &str, action: &str) -> Result<(), GatewayError> {
        let decision = self.engine.evaluate(username, resource, action);

        let outcome = match decision {
            PolicyDecision::Allow => "allow",
            PolicyDecision::Deny(_) => "deny",
        };
        counter!(
            ACCESS_DECISIONS_TOTAL,
            "action" => action.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        match decision {
            PolicyDecision::Allow => {
                debug!(user = username, resource, action, "Access granted");
                Ok(())
            }
            PolicyDecision::Deny(reason) => {
                warn!(user = username, resource, action, reason = %reason, "Access denied");
                Err(GatewayError::AccessDenied {
                    user: username.to_string(),
                    resource: resource.to_string(),
                    action: action.to_string(),
                    reason,
                })
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CipherSuite;
    use crate::rbac::Policy;
    use crate::store::InMemoryBackend;

    fn gateway() -> AccessGateway<InMemoryBackend> {
        let policy = Policy::empty()
            .with_user("alice", "editor")
            .with_user("vera", "viewer")
            .with_role("editor", ["read", "write"])
            .with_role("viewer", ["read"])
            .with_permission("read", ["report.txt"])
            .with_permission("write", ["report.txt"]);

        AccessGateway::new(
            AccessControlEngine::new(policy),
            EncryptedResourceStore::new(InMemoryBackend::new()),
            CipherContext::initialize(CipherSuite::default()).unwrap(),
        )
    }

    #[test]
    fn test_write_then_read() {
        let gw = gateway();
        gw.write_resource("alice", "report.txt", "hello").unwrap();
        assert_eq!(gw.read_resource("alice", "report.txt").unwrap(), "hello");
        assert_eq!(gw.read_resource("vera", "report.txt").unwrap(), "hello");
    }

    #[test]
    fn test_denied_write_leaves_storage_untouched() {
        let gw = gateway();
        let err = gw.write_resource("vera", "report.txt", "defaced").unwrap_err();
        assert!(err.is_access_denied());
        assert!(gw.store.backend().is_empty());
    }

    #[test]
    fn test_deny_carries_reason() {
        let gw = gateway();
        match gw.read_resource("mallory", "report.txt").unwrap_err() {
            GatewayError::AccessDenied { reason, action, .. } => {
                assert_eq!(reason, DenyReason::UnknownUser);
                assert_eq!(action, "read");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_denial_precedes_not_found() {
        let gw = gateway();
        // Never written, but the denial must win over the missing blob.
        let err = gw.read_resource("alice", "other.txt").unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_identity_surface() {
        let gw = gateway();
        assert!(gw.is_valid_user("alice"));
        assert!(!gw.is_valid_user("bob"));
        assert_eq!(gw.role_of("vera"), Some(&RoleId::new("viewer")));
        assert!(gw.can_perform("alice", "report.txt", "write"));
        assert!(!gw.can_perform("vera", "report.txt", "write"));
        assert_eq!(gw.grants("vera").len(), 1);
    }
}
