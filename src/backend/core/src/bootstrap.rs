//! Process startup: turn a [`VaultConfig`] into a ready [`AccessGateway`].

use tracing::info;

use crate::config::VaultConfig;
use crate::crypto::keys;
use crate::error::Result;
use crate::gateway::AccessGateway;
use crate::rbac::{load_policy_or_empty, AccessControlEngine};
use crate::store::{EncryptedResourceStore, FileBackend};

/// Load the policy, open storage, establish the key and assemble the gateway.
///
/// A missing or unreadable policy yields a deny-all engine. A failure to
/// establish the key aborts startup.
pub fn open_vault(config: &VaultConfig) -> Result<AccessGateway<FileBackend>> {
    config.validate()?;

    let policy = load_policy_or_empty(&config.policy_path);
    let engine = AccessControlEngine::new(policy);

    let backend = FileBackend::open(&config.storage.root)?;
    let context = keys::establish(&config.key_source(), config.key.suite, &backend)?;

    info!(
        policy = %config.policy_path.display(),
        storage = %config.storage.root.display(),
        suite = %config.key.suite,
        "Vault opened"
    );

    Ok(AccessGateway::new(
        engine,
        EncryptedResourceStore::new(backend),
        context,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySourceKind;
    use crate::error::ErrorCode;

    fn config_in(dir: &std::path::Path) -> VaultConfig {
        let mut config = VaultConfig::default();
        config.policy_path = dir.join("rbac.json");
        config.storage.root = dir.join("data");
        config
    }

    #[test]
    fn test_missing_policy_denies_everything() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = open_vault(&config_in(dir.path())).unwrap();
        assert!(!gateway.is_valid_user("alice"));
        assert!(gateway.write_resource("alice", "a.txt", "x").is_err());
    }

    #[test]
    fn test_policy_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rbac.json"),
            r#"{"users": {"alice": "editor"},
                "roles": {"editor": ["write", "read"]},
                "permissions": {"write": ["a.txt"], "read": ["a.txt"]}}"#,
        )
        .unwrap();

        let gateway = open_vault(&config_in(dir.path())).unwrap();
        gateway.write_resource("alice", "a.txt", "hello").unwrap();
        assert_eq!(gateway.read_resource("alice", "a.txt").unwrap(), "hello");
        assert!(dir.path().join("data").join("a.txt.bin").exists());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.key.source = KeySourceKind::Passphrase;

        let err = open_vault(&config).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_wrong_passphrase_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.key.source = KeySourceKind::Passphrase;
        config.key.passphrase = Some("first".into());
        open_vault(&config).unwrap();

        config.key.passphrase = Some("second".into());
        let err = open_vault(&config).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PassphraseMismatch);
    }
}
