//! Role-Based Access Control (RBAC).
//!
//! This module provides:
//! - **Models**: users, roles, permissions and the [`Policy`] aggregate
//! - **Access Control Engine**: decides whether a user may perform an action on a resource
//! - **Loader**: reads a JSON or TOML policy document into a typed [`Policy`]
//!
//! # Usage
//!
//! ```rust
//! use vault_core::rbac::{AccessControlEngine, Policy};
//!
//! let policy = Policy::empty()
//!     .with_user("alice", "editor")
//!     .with_role("editor", ["read", "write"])
//!     .with_permission("read", ["report.txt"])
//!     .with_permission("write", ["report.txt"]);
//!
//! let engine = AccessControlEngine::new(policy);
//! assert!(engine.can_write("alice", "report.txt"));
//! assert!(!engine.can_read("bob", "report.txt"));
//! ```

pub mod loader;
pub mod models;
pub mod policy;

pub use loader::{load_policy, load_policy_or_empty, parse_policy, PolicyFormat, PolicyLoadError};
pub use models::{Action, Grant, Permission, Policy, ResourceId, Role, RoleId, UserId};
pub use policy::{AccessControlEngine, DenyReason, PolicyDecision};
