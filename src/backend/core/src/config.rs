//! Configuration management.
//!
//! Values come from an optional file plus `VAULT__*` environment variables,
//! e.g. `VAULT__STORAGE__ROOT=/var/lib/vault` or `VAULT__KEY__SOURCE=passphrase`.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::crypto::{CipherSuite, KeySource};
use crate::error::{Result, VaultError};
use crate::telemetry::{LoggingConfig, MetricsConfig};

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Policy document (JSON, or TOML by extension)
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key configuration
    #[serde(default)]
    pub key: KeyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
            storage: StorageConfig::default(),
            key: KeyConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<resource>.bin` blobs
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Where the process key comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySourceKind {
    #[default]
    Ephemeral,
    Passphrase,
}

#[derive(Clone, Default, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub source: KeySourceKind,

    /// Required when `source` is `passphrase`
    #[serde(default)]
    pub passphrase: Option<String>,

    #[serde(default)]
    pub suite: CipherSuite,
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("source", &self.source)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("suite", &self.suite)
            .finish()
    }
}

// Default value functions
fn default_policy_path() -> PathBuf { PathBuf::from("rbac.json") }
fn default_storage_root() -> PathBuf { PathBuf::from(".") }

impl VaultConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        let cfg: VaultConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        let cfg: VaultConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Reject combinations that cannot produce a working vault.
    pub fn validate(&self) -> Result<()> {
        if self.key.source == KeySourceKind::Passphrase
            && self.key.passphrase.as_deref().map_or(true, str::is_empty)
        {
            return Err(VaultError::configuration(
                "key.source is 'passphrase' but no passphrase was provided",
            ));
        }
        if self.policy_path.as_os_str().is_empty() {
            return Err(VaultError::configuration("policy_path must not be empty"));
        }
        Ok(())
    }

    /// The [`KeySource`] described by the key section.
    pub fn key_source(&self) -> KeySource {
        match (self.key.source, &self.key.passphrase) {
            (KeySourceKind::Passphrase, Some(secret)) => KeySource::passphrase(secret.clone()),
            _ => KeySource::Ephemeral,
        }
    }
}
