//! Error taxonomy surfaced to callers.

use std::fmt;

use secure_signing_keystore::KeystoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-checkable error kind, stable across every backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The label argument is absent or empty.
    MissingKey,
    /// The backend reported a fault unrelated to not-found.
    KeystoreError,
    /// Key creation was rejected by the backend.
    KeyGenerationError,
    /// A payload could not be decoded into binary.
    InvalidData,
    /// No key pair is stored under the label.
    KeyNotFound,
    /// The signature operation failed or the key cannot sign.
    SigningError,
    /// A protected key needs a secure lock screen the device lacks.
    SecureLockScreenDisabled,
    /// A protected key needs a user confirmation that was not given.
    UserNotAuthenticated,
    /// Operating-system level failure.
    OsError,
    /// Unclassified failure.
    UnknownError,
}

impl ErrorKind {
    /// Wire code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingKey => "missingKey",
            Self::KeystoreError => "keystoreError",
            Self::KeyGenerationError => "keyGenerationError",
            Self::InvalidData => "invalidData",
            Self::KeyNotFound => "keyNotFound",
            Self::SigningError => "signingError",
            Self::SecureLockScreenDisabled => "secureLockScreenDisabled",
            Self::UserNotAuthenticated => "userNotAuthenticated",
            Self::OsError => "osError",
            Self::UnknownError => "unknownError",
        }
    }

    /// Whether the user can typically fix the condition by (re)authenticating
    /// or configuring a lock screen.
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::SecureLockScreenDisabled | Self::UserNotAuthenticated)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which key operation a backend failure happened in.
///
/// The same backend fault maps to different kinds depending on context: a
/// rejected write is a `KeyGenerationError` while generating but a
/// `KeystoreError` anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Existence check.
    Query,
    /// Key generation.
    Generate,
    /// Key lookup.
    Retrieve,
    /// Key deletion.
    Delete,
    /// Signature creation.
    Sign,
    /// Label enumeration.
    List,
}

/// Errors returned by key management and signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The label argument is absent or empty.
    #[error("Empty key or missing key param")]
    MissingKey,

    /// The secure backend failed.
    #[error("KeyStore related error: {reason}")]
    Keystore {
        /// Backend diagnostic.
        reason: String,
    },

    /// Key creation rejected.
    #[error("Error while generating the key: {reason}")]
    KeyGeneration {
        /// Backend diagnostic.
        reason: String,
    },

    /// Payload is not decodable.
    #[error("Invalid data: {reason}")]
    InvalidData {
        /// What could not be decoded.
        reason: String,
    },

    /// No key pair under the label.
    #[error("Key not found: {label}")]
    KeyNotFound {
        /// The label that was looked up.
        label: String,
    },

    /// The signature could not be produced.
    #[error("Signing failed: {reason}")]
    Signing {
        /// Backend or algorithm diagnostic.
        reason: String,
    },

    /// Device has no secure lock screen.
    #[error("Secure lock screen must be enabled to create keys requiring user authentication")]
    SecureLockScreenDisabled,

    /// User authentication required but not provided.
    #[error("User must be authenticated to use this key")]
    UserNotAuthenticated,

    /// Operating-system failure.
    #[error("OS error: {reason}")]
    Os {
        /// OS diagnostic.
        reason: String,
    },

    /// Anything else.
    #[error("Unknown error: {reason}")]
    Unknown {
        /// Diagnostic.
        reason: String,
    },
}

impl SigningError {
    /// Machine-checkable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingKey => ErrorKind::MissingKey,
            Self::Keystore { .. } => ErrorKind::KeystoreError,
            Self::KeyGeneration { .. } => ErrorKind::KeyGenerationError,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::Signing { .. } => ErrorKind::SigningError,
            Self::SecureLockScreenDisabled => ErrorKind::SecureLockScreenDisabled,
            Self::UserNotAuthenticated => ErrorKind::UserNotAuthenticated,
            Self::Os { .. } => ErrorKind::OsError,
            Self::Unknown { .. } => ErrorKind::UnknownError,
        }
    }

    /// Create an invalid data error.
    #[must_use]
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing {
            reason: reason.into(),
        }
    }

    /// Classify a backend failure that happened during `op`.
    #[must_use]
    pub fn from_keystore(op: Operation, err: KeystoreError) -> Self {
        let reason = err.to_string();
        match err {
            KeystoreError::InvalidLabel => Self::MissingKey,
            KeystoreError::SecureLockScreenDisabled => Self::SecureLockScreenDisabled,
            KeystoreError::UserNotAuthenticated => Self::UserNotAuthenticated,
            KeystoreError::Io(_) | KeystoreError::PlatformError { .. } => Self::Os { reason },
            KeystoreError::KeyAlreadyExists { .. } | KeystoreError::KeyGenerationFailed { .. } => {
                Self::KeyGeneration { reason }
            },
            KeystoreError::NoPlatformSupport
            | KeystoreError::HardwareNotAvailable { .. }
            | KeystoreError::InvalidConfiguration { .. }
                if op == Operation::Generate =>
            {
                Self::KeyGeneration { reason }
            },
            KeystoreError::NotSupported { .. } if op == Operation::Sign => Self::Signing { reason },
            KeystoreError::NoPlatformSupport
            | KeystoreError::HardwareNotAvailable { .. }
            | KeystoreError::InvalidConfiguration { .. }
            | KeystoreError::NotSupported { .. }
            | KeystoreError::RetrievalFailed { .. }
            | KeystoreError::DeletionFailed { .. }
            | KeystoreError::StorageCorrupted { .. }
            | KeystoreError::InvalidKey { .. }
            | KeystoreError::SerializationError(_) => Self::Keystore { reason },
        }
    }
}
