//! Crate-level error handling for Vault Core.
//!
//! Each module reports failures through its own `thiserror` enum
//! ([`GatewayError`], [`StoreError`], [`CipherError`], [`KeyError`],
//! [`PolicyLoadError`]). At process boundaries those are folded into a single
//! [`VaultError`] that carries:
//! - a stable machine-readable [`ErrorCode`] and numeric code
//! - a user-facing message kept separate from internal detail
//! - a severity that drives logging
//! - a `vault_errors_total` counter per code
//!
//! # Usage
//!
//! ```rust,ignore
//! use vault_core::error::{Result, VaultError};
//!
//! fn read(gateway: &AccessGateway<FileBackend>) -> Result<String> {
//!     Ok(gateway.read_resource("alice", "report.txt")?)
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, error, warn};

use crate::crypto::{CipherError, KeyError};
use crate::gateway::GatewayError;
use crate::rbac::PolicyLoadError;
use crate::store::StoreError;
use crate::telemetry::ERRORS_TOTAL;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These are stable and are what the CLI prints in JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authorization (1000-1099)
    AccessDenied,

    // Storage (2000-2099)
    ResourceNotFound,
    InvalidResourceName,
    InvalidText,
    StorageIoError,

    // Cryptography (3000-3099)
    DecodingFailed,
    AuthenticationFailed,
    EncryptionFailed,
    KeyGenerationFailed,
    KeyDerivationFailed,
    PassphraseMismatch,
    CorruptKeyMaterial,

    // Policy (4000-4099)
    PolicyNotFound,
    PolicyLoadFailed,

    // Configuration (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Internal (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::AccessDenied => 1000,

            Self::ResourceNotFound => 2000,
            Self::InvalidResourceName => 2001,
            Self::InvalidText => 2002,
            Self::StorageIoError => 2003,

            Self::DecodingFailed => 3000,
            Self::AuthenticationFailed => 3001,
            Self::EncryptionFailed => 3002,
            Self::KeyGenerationFailed => 3003,
            Self::KeyDerivationFailed => 3004,
            Self::PassphraseMismatch => 3005,
            Self::CorruptKeyMaterial => 3006,

            Self::PolicyNotFound => 4000,
            Self::PolicyLoadFailed => 4001,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            Self::InternalError => 9000,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "authorization",
            2000..=2099 => "storage",
            3000..=3099 => "crypto",
            4000..=4099 => "policy",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Ordinary outcomes: denials, missing resources, bad names
    Low,
    /// Operator mistakes: wrong passphrase, bad policy or config
    Medium,
    /// Storage faults and tampered content
    High,
    /// The process cannot operate securely
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::AccessDenied
            | ErrorCode::ResourceNotFound
            | ErrorCode::InvalidResourceName
            | ErrorCode::InvalidText => Self::Low,

            ErrorCode::PassphraseMismatch
            | ErrorCode::PolicyNotFound
            | ErrorCode::PolicyLoadFailed
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::Medium,

            ErrorCode::StorageIoError
            | ErrorCode::DecodingFailed
            | ErrorCode::AuthenticationFailed
            | ErrorCode::CorruptKeyMaterial => Self::High,

            ErrorCode::EncryptionFailed
            | ErrorCode::KeyGenerationFailed
            | ErrorCode::KeyDerivationFailed
            | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Vault Core.
#[derive(Debug)]
pub struct VaultError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-facing message (never contains plaintext or key material)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// The source error that caused this error
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl std::error::Error for VaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl VaultError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    pub fn is_access_denied(&self) -> bool {
        self.code == ErrorCode::AccessDenied
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                debug!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            ERRORS_TOTAL,
            "code" => self.code.to_string(),
            "category" => self.code.category(),
            "severity" => format!("{:?}", self.severity())
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<CipherError> for VaultError {
    fn from(error: CipherError) -> Self {
        let (code, user_msg) = match &error {
            CipherError::KeyGeneration(_) => (
                ErrorCode::KeyGenerationFailed,
                "Unable to generate an encryption key",
            ),
            CipherError::Encryption(_) => (ErrorCode::EncryptionFailed, "Encryption failed"),
            CipherError::Authentication => (
                ErrorCode::AuthenticationFailed,
                "Stored content failed authentication (tampered or sealed under another key)",
            ),
            CipherError::Decoding(_) => (
                ErrorCode::DecodingFailed,
                "Stored content is malformed",
            ),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<StoreError> for VaultError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Cipher(inner) => inner.into(),
            StoreError::NotFound(ref name) => {
                Self::new(ErrorCode::ResourceNotFound, format!("Resource not found: {}", name))
                    .with_source(error)
            }
            StoreError::InvalidResourceName { ref name, reason } => Self::new(
                ErrorCode::InvalidResourceName,
                format!("Invalid resource name '{}': {}", name, reason),
            )
            .with_source(error),
            StoreError::InvalidText(ref name) => Self::new(
                ErrorCode::InvalidText,
                format!("Resource '{}' does not hold UTF-8 text", name),
            )
            .with_source(error),
            StoreError::Io { .. } => Self::with_internal(
                ErrorCode::StorageIoError,
                "A storage error occurred",
                error.to_string(),
            )
            .with_source(error),
        }
    }
}

impl From<GatewayError> for VaultError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Store(inner) => inner.into(),
            GatewayError::AccessDenied { ref reason, .. } => {
                let internal = reason.to_string();
                Self::with_internal(ErrorCode::AccessDenied, error.to_string(), internal)
                    .with_source(error)
            }
        }
    }
}

impl From<KeyError> for VaultError {
    fn from(error: KeyError) -> Self {
        match error {
            KeyError::Cipher(inner) => inner.into(),
            KeyError::Store(inner) => inner.into(),
            KeyError::PassphraseMismatch => Self::new(
                ErrorCode::PassphraseMismatch,
                "Passphrase does not match the one this store was created with",
            )
            .with_source(error),
            KeyError::Derivation(_) => Self::with_internal(
                ErrorCode::KeyDerivationFailed,
                "Key derivation failed",
                error.to_string(),
            )
            .with_source(error),
            KeyError::CorruptSalt(_) => Self::with_internal(
                ErrorCode::CorruptKeyMaterial,
                "Stored key material is corrupt",
                error.to_string(),
            )
            .with_source(error),
        }
    }
}

impl From<PolicyLoadError> for VaultError {
    fn from(error: PolicyLoadError) -> Self {
        let code = match &error {
            PolicyLoadError::NotFound(_) => ErrorCode::PolicyNotFound,
            _ => ErrorCode::PolicyLoadFailed,
        };
        Self::with_internal(code, "Unable to load the access policy", error.to_string())
            .with_source(error)
    }
}

impl From<std::io::Error> for VaultError {
    fn from(error: std::io::Error) -> Self {
        Self::with_internal(
            ErrorCode::StorageIoError,
            "An I/O error occurred",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<config::ConfigError> for VaultError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
