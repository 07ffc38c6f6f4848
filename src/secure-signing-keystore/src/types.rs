//! Core types shared by every key store backend.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::KeystoreError;

/// Opaque, caller-supplied name of a key pair.
///
/// Two labels are equal iff their UTF-8 bytes are identical. The store never
/// interprets the structure of a label; namespacing is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyLabel(String);

impl KeyLabel {
    /// Create a label, rejecting the empty string.
    pub fn new(label: impl Into<String>) -> Result<Self, KeystoreError> {
        let label = label.into();
        if label.is_empty() {
            return Err(KeystoreError::InvalidLabel);
        }
        Ok(Self(label))
    }

    /// The label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The label's storage tag bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for KeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for KeyLabel {
    type Error = KeystoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for KeyLabel {
    type Error = KeystoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyLabel> for String {
    fn from(label: KeyLabel) -> Self {
        label.0
    }
}

/// Algorithm family of a stored key pair.
///
/// Only [`KeyAlgorithm::EcdsaP256`] is ever generated. Ed25519 material can
/// still be found under a label when it was written by an older tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    /// ECDSA over NIST P-256 with SHA-256 digests.
    #[default]
    EcdsaP256,

    /// Ed25519 (legacy imports only).
    Ed25519,
}

impl KeyAlgorithm {
    /// Public key size in bytes as exported by the store.
    #[must_use]
    pub const fn public_key_size(&self) -> usize {
        match self {
            Self::EcdsaP256 => 65, // 0x04 || X (32) || Y (32)
            Self::Ed25519 => 32,
        }
    }

    /// Private key (scalar or seed) size in bytes.
    #[must_use]
    pub const fn secret_size(&self) -> usize {
        32
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EcdsaP256 => f.write_str("ECDSA-P256-SHA256"),
            Self::Ed25519 => f.write_str("Ed25519"),
        }
    }
}

/// Access-control level attached to a key pair.
///
/// The tier affects when a key may be used, never its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "tier", rename_all = "camelCase")]
pub enum PermissionTier {
    /// Usable whenever the store is readable.
    #[default]
    Ordinary,

    /// Usable only within `validity_seconds` of a user-presence confirmation.
    #[serde(rename_all = "camelCase")]
    AuthenticationRequired {
        /// How long one confirmation authorises use of the key.
        validity_seconds: u32,
    },
}

impl PermissionTier {
    /// Default validity of one confirmation: 15 minutes.
    pub const DEFAULT_AUTH_VALIDITY_SECONDS: u32 = 15 * 60;

    /// Authentication-required tier with the default validity window.
    #[must_use]
    pub const fn authentication_required() -> Self {
        Self::AuthenticationRequired {
            validity_seconds: Self::DEFAULT_AUTH_VALIDITY_SECONDS,
        }
    }

    /// Whether use of the key requires user presence.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }

    /// Validity window of one confirmation, if authentication is required.
    #[must_use]
    pub fn auth_validity(&self) -> Option<Duration> {
        match self {
            Self::Ordinary => None,
            Self::AuthenticationRequired { validity_seconds } => {
                Some(Duration::from_secs(u64::from(*validity_seconds)))
            },
        }
    }
}

/// Kind of storage a backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BackendType {
    /// OS credential store (Keychain, Credential Manager, Secret Service).
    OsKeyring = 1,

    /// Encrypted files in a local directory.
    EncryptedFile = 2,

    /// Process memory only.
    /// WARNING: keys are lost when the process exits.
    Memory = 3,
}

impl BackendType {
    /// Security level (1-3, higher is better).
    #[must_use]
    pub const fn security_level(&self) -> u8 {
        match self {
            Self::OsKeyring => 3,
            Self::EncryptedFile => 2,
            Self::Memory => 1,
        }
    }

    /// Whether keys survive a process restart.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }

    /// Short name used in logs and CLI output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OsKeyring => "os-keyring",
            Self::EncryptedFile => "encrypted-file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of deleting a key pair.
///
/// An already-absent key is a normal outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteOutcome {
    /// A key pair existed and was removed.
    Deleted,
    /// No key pair was stored under the label.
    NotFound,
}

impl DeleteOutcome {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "DELETED",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
