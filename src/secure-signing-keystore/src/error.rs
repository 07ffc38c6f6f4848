//! Error types for key store backends.

use thiserror::Error;

/// Errors reported by a [`KeyStore`](crate::KeyStore) backend.
///
/// Not-found is never an error at this level: lookups return `Ok(None)`,
/// existence checks `Ok(false)` and deletions `Ok(DeleteOutcome::NotFound)`.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// No usable backend on this platform.
    #[error("No key store backend available on this platform")]
    NoPlatformSupport,

    /// Hardware-backed storage was required but is not available.
    #[error("Hardware not available: {reason}")]
    HardwareNotAvailable {
        /// Reason hardware is not available.
        reason: String,
    },

    /// A key pair is already stored under this label.
    #[error("Key already exists: {label}")]
    KeyAlreadyExists {
        /// The label that is already taken.
        label: String,
    },

    /// The backend rejected key generation.
    #[error("Key generation failed: {reason}")]
    KeyGenerationFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Reading a stored key failed for a reason other than absence.
    #[error("Key retrieval failed: {reason}")]
    RetrievalFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Removing a stored key failed for a reason other than absence.
    #[error("Key deletion failed: {reason}")]
    DeletionFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// A stored record could not be decrypted, parsed, or does not belong
    /// to the label it was found under.
    #[error("Key store corrupted: {reason}")]
    StorageCorrupted {
        /// What was wrong with the record.
        reason: String,
    },

    /// Key material has the wrong shape for its declared algorithm.
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// The label is empty.
    #[error("Key label must not be empty")]
    InvalidLabel,

    /// An authentication-required key was requested on a device without a
    /// secure lock screen.
    #[error("Secure lock screen must be enabled to create keys requiring user authentication")]
    SecureLockScreenDisabled,

    /// The key requires user authentication that has not been satisfied.
    #[error("User not authenticated")]
    UserNotAuthenticated,

    /// Platform-specific error.
    #[error("Platform error: {message}")]
    PlatformError {
        /// Error message from the platform.
        message: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Store configuration cannot be satisfied.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Operation not supported by this backend.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },
}

impl KeystoreError {
    /// Create a platform error from a message.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::PlatformError {
            message: message.into(),
        }
    }

    /// Create a key generation error from a reason.
    #[must_use]
    pub fn generation(reason: impl Into<String>) -> Self {
        Self::KeyGenerationFailed {
            reason: reason.into(),
        }
    }

    /// Create a retrieval error from a reason.
    #[must_use]
    pub fn retrieval(reason: impl Into<String>) -> Self {
        Self::RetrievalFailed {
            reason: reason.into(),
        }
    }

    /// Create a deletion error from a reason.
    #[must_use]
    pub fn deletion(reason: impl Into<String>) -> Self {
        Self::DeletionFailed {
            reason: reason.into(),
        }
    }

    /// Create a corruption error from a reason.
    #[must_use]
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::StorageCorrupted {
            reason: reason.into(),
        }
    }

    /// Lock poisoning inside a backend.
    pub(crate) fn poisoned() -> Self {
        Self::platform("Lock poisoned")
    }

    /// Whether the failure is the user-authentication prerequisite of a
    /// protected key rather than a storage fault.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::SecureLockScreenDisabled | Self::UserNotAuthenticated
        )
    }
}

impl From<serde_json::Error> for KeystoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for KeystoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::PlatformError {
            message: format!("Backend task failed: {err}"),
        }
    }
}
