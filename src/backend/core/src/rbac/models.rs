//! RBAC data models: identifiers, Role, Permission, and the Policy aggregate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Strongly-typed username.
    UserId
}

string_id! {
    /// Strongly-typed role name.
    RoleId
}

string_id! {
    /// A permission name, which doubles as the action it grants
    /// (`"read"`, `"write"`, ...).
    Action
}

string_id! {
    /// Logical name of a stored resource (e.g. `report.txt`).
    ResourceId
}

impl Action {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";

    pub fn read() -> Self {
        Self::new(Self::READ)
    }

    pub fn write() -> Self {
        Self::new(Self::WRITE)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role / Permission
// ═══════════════════════════════════════════════════════════════════════════════

/// A role names the permissions it holds. Permission names are references
/// into [`Policy::permissions`] and may dangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleId,
    pub permissions: BTreeSet<Action>,
}

impl Role {
    pub fn new(name: impl Into<RoleId>, permissions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn holds(&self, action: &str) -> bool {
        self.permissions.contains(action)
    }
}

/// An action label paired with the resources it is granted over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: Action,
    pub resources: BTreeSet<ResourceId>,
}

impl Permission {
    pub fn new(
        name: impl Into<Action>,
        resources: impl IntoIterator<Item = ResourceId>,
    ) -> Self {
        Self {
            name: name.into(),
            resources: resources.into_iter().collect(),
        }
    }

    pub fn covers(&self, resource: &str) -> bool {
        self.resources.contains(resource)
    }
}

/// One effective `(action, resource)` pair a user holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Grant {
    pub action: Action,
    pub resource: ResourceId,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// The complete, read-only authorization policy.
///
/// Built once (usually by [`crate::rbac::loader`]) and shared behind an
/// `Arc`. Cross references between the three maps are not validated:
/// the engine resolves a dangling reference to "no grant".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub users: HashMap<UserId, RoleId>,
    pub roles: HashMap<RoleId, Role>,
    pub permissions: HashMap<Action, Permission>,
}

impl Policy {
    /// A policy that grants nothing to anyone.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.roles.is_empty() && self.permissions.is_empty()
    }

    pub fn with_user(mut self, user: impl Into<UserId>, role: impl Into<RoleId>) -> Self {
        self.users.insert(user.into(), role.into());
        self
    }

    pub fn with_role<I, A>(mut self, role: impl Into<RoleId>, permissions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        let role = Role::new(role, permissions.into_iter().map(Into::into));
        self.roles.insert(role.name.clone(), role);
        self
    }

    pub fn with_permission<I, R>(mut self, name: impl Into<Action>, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceId>,
    {
        let permission = Permission::new(name, resources.into_iter().map(Into::into));
        self.permissions.insert(permission.name.clone(), permission);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_and_borrow() {
        let user = UserId::new("alice");
        assert_eq!(user.to_string(), "alice");
        assert_eq!(user.as_str(), "alice");

        let mut users: HashMap<UserId, RoleId> = HashMap::new();
        users.insert(user, RoleId::from("editor"));
        assert!(users.contains_key("alice"));
    }

    #[test]
    fn test_action_constants() {
        assert_eq!(Action::read().as_str(), "read");
        assert_eq!(Action::write().as_str(), "write");
    }

    #[test]
    fn test_role_holds() {
        let role = Role::new("viewer", [Action::read()]);
        assert!(role.holds("read"));
        assert!(!role.holds("write"));
    }

    #[test]
    fn test_permission_covers() {
        let perm = Permission::new("read", [ResourceId::new("a.txt")]);
        assert!(perm.covers("a.txt"));
        assert!(!perm.covers("b.txt"));
    }

    #[test]
    fn test_policy_builder() {
        let policy = Policy::empty()
            .with_user("alice", "editor")
            .with_role("editor", ["read", "write"])
            .with_permission("read", ["report.txt"]);

        assert!(!policy.is_empty());
        assert_eq!(policy.users.get("alice"), Some(&RoleId::new("editor")));
        assert!(policy.roles["editor"].holds("write"));
        assert!(policy.permissions["read"].covers("report.txt"));
        assert!(Policy::empty().is_empty());
    }
}
