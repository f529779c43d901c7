//! End-to-end tests through the access gateway.
//!
//! Tests cover:
//! - The editor/viewer/unknown-user scenarios
//! - Storage left untouched on denial
//! - Tampered and swapped blobs on disk
//! - Passphrase-derived keys across separate gateway instances
//! - Concurrent sessions against one storage directory

use std::path::Path;
use std::sync::Arc;
use std::thread;

use vault_core::bootstrap::open_vault;
use vault_core::config::{KeySourceKind, VaultConfig};
use vault_core::crypto::{CipherContext, CipherSuite};
use vault_core::error::{ErrorCode, VaultError};
use vault_core::gateway::{AccessGateway, GatewayError};
use vault_core::rbac::{AccessControlEngine, DenyReason, Policy};
use vault_core::store::{BlobBackend, EncryptedResourceStore, FileBackend, InMemoryBackend};

const POLICY_JSON: &str = r#"{
    "users": {"alice": "editor", "vera": "viewer"},
    "roles": {"editor": ["read", "write"], "viewer": ["read"]},
    "permissions": {
        "read": ["report.txt", "other.txt"],
        "write": ["report.txt", "other.txt"]
    }
}"#;

fn editor_policy() -> Policy {
    Policy::empty()
        .with_user("alice", "editor")
        .with_role("editor", ["read", "write"])
        .with_permission("read", ["report.txt"])
        .with_permission("write", ["report.txt"])
}

fn memory_gateway(policy: Policy) -> AccessGateway<InMemoryBackend> {
    AccessGateway::new(
        AccessControlEngine::new(policy),
        EncryptedResourceStore::new(InMemoryBackend::new()),
        CipherContext::initialize(CipherSuite::default()).unwrap(),
    )
}

fn passphrase_config(dir: &Path, passphrase: &str) -> VaultConfig {
    std::fs::write(dir.join("rbac.json"), POLICY_JSON).unwrap();

    let mut config = VaultConfig::default();
    config.policy_path = dir.join("rbac.json");
    config.storage.root = dir.join("data");
    config.key.source = KeySourceKind::Passphrase;
    config.key.passphrase = Some(passphrase.to_string());
    config
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_editor_reads_back_what_it_wrote() {
    let gateway = memory_gateway(editor_policy());

    gateway.write_resource("alice", "report.txt", "hello").unwrap();
    assert_eq!(gateway.read_resource("alice", "report.txt").unwrap(), "hello");
}

#[test]
fn test_granted_but_never_written_is_not_found() {
    let policy = editor_policy()
        .with_permission("read", ["report.txt", "other.txt"]);
    let gateway = memory_gateway(policy);

    let err = gateway.read_resource("alice", "other.txt").unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn test_ungranted_resource_is_denied_before_storage() {
    let gateway = memory_gateway(editor_policy());

    let err = gateway.read_resource("alice", "other.txt").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::AccessDenied {
            reason: DenyReason::NoGrant,
            ..
        }
    ));
}

#[test]
fn test_unknown_user_write_denied_and_storage_unchanged() {
    let backend = Arc::new(InMemoryBackend::new());
    let gateway = AccessGateway::new(
        AccessControlEngine::new(editor_policy()),
        EncryptedResourceStore::new(Arc::clone(&backend)),
        CipherContext::initialize(CipherSuite::default()).unwrap(),
    );

    gateway.write_resource("alice", "report.txt", "original").unwrap();
    let before = backend.get("report.txt").unwrap();

    let err = gateway.write_resource("bob", "report.txt", "x").unwrap_err();
    assert!(matches!(
        err,
        GatewayError::AccessDenied {
            reason: DenyReason::UnknownUser,
            ..
        }
    ));

    assert_eq!(backend.get("report.txt").unwrap(), before);
    assert_eq!(backend.len(), 1);
    assert_eq!(gateway.read_resource("alice", "report.txt").unwrap(), "original");
}

#[test]
fn test_viewer_cannot_write_anything() {
    let policy = editor_policy()
        .with_user("vera", "viewer")
        .with_role("viewer", ["read"])
        .with_permission("write", ["report.txt", "notes.txt", "other.txt"]);
    let gateway = memory_gateway(policy);

    for resource in ["report.txt", "notes.txt", "other.txt", "anything.txt"] {
        let err = gateway.write_resource("vera", resource, "x").unwrap_err();
        assert!(err.is_access_denied(), "{resource}");
    }
}

#[test]
fn test_denial_maps_to_access_denied_code() {
    let gateway = memory_gateway(editor_policy());
    let err: VaultError = gateway
        .write_resource("bob", "report.txt", "x")
        .unwrap_err()
        .into();

    assert_eq!(err.code(), ErrorCode::AccessDenied);
    assert!(err.user_message().contains("bob"));
}

// ============================================================================
// On-disk Integrity
// ============================================================================

#[test]
fn test_tampered_file_fails_authentication() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    let gateway = AccessGateway::new(
        AccessControlEngine::new(editor_policy()),
        EncryptedResourceStore::new(backend),
        CipherContext::initialize(CipherSuite::default()).unwrap(),
    );
    gateway.write_resource("alice", "report.txt", "quarterly numbers").unwrap();

    let path = dir.path().join("report.txt.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x01;
    std::fs::write(&path, &bytes).unwrap();

    let err: VaultError = gateway
        .read_resource("alice", "report.txt")
        .unwrap_err()
        .into();
    assert_eq!(err.code(), ErrorCode::AuthenticationFailed);
}

#[test]
fn test_truncated_file_fails_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = AccessGateway::new(
        AccessControlEngine::new(editor_policy()),
        EncryptedResourceStore::new(FileBackend::open(dir.path()).unwrap()),
        CipherContext::initialize(CipherSuite::default()).unwrap(),
    );
    std::fs::write(dir.path().join("report.txt.bin"), [0u8; 10]).unwrap();

    let err: VaultError = gateway
        .read_resource("alice", "report.txt")
        .unwrap_err()
        .into();
    assert_eq!(err.code(), ErrorCode::DecodingFailed);
}

// ============================================================================
// Key Persistence
// ============================================================================

#[test]
fn test_passphrase_reopens_content_in_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let config = passphrase_config(dir.path(), "correct horse battery staple");

    {
        let first = open_vault(&config).unwrap();
        first.write_resource("alice", "report.txt", "survives restarts").unwrap();
    }

    let second = open_vault(&config).unwrap();
    assert_eq!(
        second.read_resource("vera", "report.txt").unwrap(),
        "survives restarts"
    );
}

#[test]
fn test_wrong_passphrase_rejected_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = passphrase_config(dir.path(), "right");
    open_vault(&config)
        .unwrap()
        .write_resource("alice", "report.txt", "secret")
        .unwrap();

    let wrong = passphrase_config(dir.path(), "wrong");
    let err = open_vault(&wrong).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PassphraseMismatch);
}

#[test]
fn test_ephemeral_content_unreadable_by_next_instance() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = passphrase_config(dir.path(), "unused");
    config.key.source = KeySourceKind::Ephemeral;
    config.key.passphrase = None;

    open_vault(&config)
        .unwrap()
        .write_resource("alice", "report.txt", "gone")
        .unwrap();

    let err: VaultError = open_vault(&config)
        .unwrap()
        .read_resource("alice", "report.txt")
        .unwrap_err()
        .into();
    assert_eq!(err.code(), ErrorCode::AuthenticationFailed);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_writers_leave_a_whole_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = passphrase_config(dir.path(), "shared");
    let gateway = Arc::new(open_vault(&config).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                let content = format!("writer-{i}-").repeat(64);
                for _ in 0..10 {
                    gateway.write_resource("alice", "report.txt", &content).unwrap();
                    let read = gateway.read_resource("alice", "report.txt").unwrap();
                    assert!(read.starts_with("writer-"));
                    assert_eq!(read.len(), content.len());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let last = gateway.read_resource("vera", "report.txt").unwrap();
    assert!((0..4).any(|i| last == format!("writer-{i}-").repeat(64)));
}
