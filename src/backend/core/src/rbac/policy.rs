//! Access-control engine for evaluating authorization decisions.
//!
//! The engine answers the question:
//! "May user U perform action A on resource R?"
//!
//! Evaluation is total and side-effect free. Unknown users, unknown roles and
//! dangling permission names all resolve to a denial carried in the returned
//! [`PolicyDecision`]; nothing in here returns an error or panics.

use std::fmt;
use std::sync::Arc;

use super::models::{Action, Grant, Policy, RoleId};

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// The username is not present in the policy.
    UnknownUser,
    /// The user's role is not defined in the policy.
    UnknownRole,
    /// No permission of the role grants the action on the resource.
    NoGrant,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownUser => "unknown_user",
            Self::UnknownRole => "unknown_role",
            Self::NoGrant => "no_grant",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason.
    Deny(DenyReason),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(*reason),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Stateless decision logic over a shared, read-only [`Policy`].
///
/// Cloning is cheap; clones share the same policy.
#[derive(Debug, Clone)]
pub struct AccessControlEngine {
    policy: Arc<Policy>,
}

impl AccessControlEngine {
    pub fn new(policy: impl Into<Arc<Policy>>) -> Self {
        Self {
            policy: policy.into(),
        }
    }

    /// An engine that denies everything.
    pub fn deny_all() -> Self {
        Self::new(Policy::empty())
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// True iff `username` is a key in the policy's user table.
    pub fn is_valid_user(&self, username: &str) -> bool {
        self.policy.users.contains_key(username)
    }

    /// The role assigned to `username`, if the user exists.
    pub fn role_of(&self, username: &str) -> Option<&RoleId> {
        self.policy.users.get(username)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate whether `username` may perform `action` on `resource`.
    ///
    /// This is the only decision algorithm; every other check delegates here.
    pub fn evaluate(&self, username: &str, resource: &str, action: &str) -> PolicyDecision {
        let Some(role_id) = self.role_of(username) else {
            return PolicyDecision::Deny(DenyReason::UnknownUser);
        };
        let Some(role) = self.policy.roles.get(role_id) else {
            return PolicyDecision::Deny(DenyReason::UnknownRole);
        };

        let granted = role
            .permissions
            .iter()
            .filter(|permission| permission.as_str() == action)
            .filter_map(|permission| self.policy.permissions.get(permission))
            .any(|permission| permission.covers(resource));

        if granted {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(DenyReason::NoGrant)
        }
    }

    /// Boolean form of [`evaluate`](Self::evaluate).
    pub fn decide(&self, username: &str, resource: &str, action: &str) -> bool {
        self.evaluate(username, resource, action).is_allowed()
    }

    pub fn can_perform(&self, username: &str, resource: &str, action: &str) -> bool {
        self.decide(username, resource, action)
    }

    pub fn can_read(&self, username: &str, resource: &str) -> bool {
        self.decide(username, resource, Action::READ)
    }

    pub fn can_write(&self, username: &str, resource: &str) -> bool {
        self.decide(username, resource, Action::WRITE)
    }

    /// Every `(action, resource)` pair the user's role effectively grants,
    /// sorted by action then resource. Dangling permission names contribute
    /// nothing; an unknown user or role yields an empty list.
    pub fn grants(&self, username: &str) -> Vec<Grant> {
        let Some(role) = self
            .role_of(username)
            .and_then(|role_id| self.policy.roles.get(role_id))
        else {
            return Vec::new();
        };

        let mut grants: Vec<Grant> = role
            .permissions
            .iter()
            .filter_map(|name| self.policy.permissions.get(name))
            .flat_map(|permission| {
                permission.resources.iter().map(|resource| Grant {
                    action: permission.name.clone(),
                    resource: resource.clone(),
                })
            })
            .collect();
        grants.sort();
        grants.dedup();
        grants
    }
}

impl Default for AccessControlEngine {
    fn default() -> Self {
        Self::deny_all()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
