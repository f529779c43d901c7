//! Policy document loading.
//!
//! The document has three top-level tables:
//!
//! ```json
//! {
//!   "users":       { "alice": "editor" },
//!   "roles":       { "editor": ["read", "write"] },
//!   "permissions": { "read": ["report.txt"], "write": ["report.txt"] }
//! }
//! ```
//!
//! JSON is the default format; a path ending in `.toml` is parsed as TOML.
//! A missing table is treated as empty, which makes every decision deny.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{Action, Permission, Policy, ResourceId, Role, RoleId, UserId};

/// Errors raised while reading a policy document.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("Policy document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read policy document {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON policy document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML policy document: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Json,
    Toml,
}

impl PolicyFormat {
    /// Pick a format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Wire shape of the policy document.
#[derive(Debug, Default, Deserialize)]
struct PolicyDocument {
    users: Option<HashMap<String, String>>,
    roles: Option<HashMap<String, Vec<String>>>,
    permissions: Option<HashMap<String, Vec<String>>>,
}

impl PolicyDocument {
    fn into_policy(self) -> Policy {
        for (section, present) in [
            ("users", self.users.is_some()),
            ("roles", self.roles.is_some()),
            ("permissions", self.permissions.is_some()),
        ] {
            if !present {
                warn!(section, "Policy document has no section; every request will be denied");
            }
        }

        let users = self
            .users
            .unwrap_or_default()
            .into_iter()
            .map(|(user, role)| (UserId::new(user), RoleId::new(role)))
            .collect();

        let roles = self
            .roles
            .unwrap_or_default()
            .into_iter()
            .map(|(name, permissions)| {
                let role = Role::new(name, permissions.into_iter().map(Action::new));
                (role.name.clone(), role)
            })
            .collect();

        let permissions = self
            .permissions
            .unwrap_or_default()
            .into_iter()
            .map(|(name, resources)| {
                let permission =
                    Permission::new(name, resources.into_iter().map(ResourceId::new));
                (permission.name.clone(), permission)
            })
            .collect();

        Policy {
            users,
            roles,
            permissions,
        }
    }
}

/// Parse a policy document from a string.
pub fn parse_policy(content: &str, format: PolicyFormat) -> Result<Policy, PolicyLoadError> {
    let document: PolicyDocument = match format {
        PolicyFormat::Json => serde_json::from_str(content)?,
        PolicyFormat::Toml => toml::from_str(content)?,
    };
    Ok(document.into_policy())
}

/// Read and parse the policy document at `path`.
pub fn load_policy(path: impl AsRef<Path>) -> Result<Policy, PolicyLoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PolicyLoadError::NotFound(path.to_path_buf())
        } else {
            PolicyLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let policy = parse_policy(&content, PolicyFormat::from_path(path))?;
    debug!(
        path = %path.display(),
        users = policy.users.len(),
        roles = policy.roles.len(),
        permissions = policy.permissions.len(),
        "Loaded policy document"
    );
    Ok(policy)
}

/// Load the policy at `path`, falling back to an empty (deny-all) policy on
/// any failure.
pub fn load_policy_or_empty(path: impl AsRef<Path>) -> Policy {
    let path = path.as_ref();
    match load_policy(path) {
        Ok(policy) => policy,
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "Failed to load policy document; denying all requests"
            );
            Policy::empty()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
