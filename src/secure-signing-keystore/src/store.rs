//! Key store trait and generation configuration.
//!
//! This module defines the [`KeyStore`] trait every backend implements. It is
//! the only way the rest of the system reaches persistent key storage, so a
//! test double can replace the platform backend wholesale.

use async_trait::async_trait;

use crate::error::KeystoreError;
use crate::handle::KeyPairHandle;
use crate::types::{BackendType, DeleteOutcome, KeyLabel, PermissionTier};

/// Configuration for key generation.
#[derive(Debug, Clone, Default)]
pub struct KeyGenConfig {
    /// Access-control tier of the new key.
    pub tier: PermissionTier,

    /// Require hardware-backed key storage.
    /// If true and the backend is software-only, generation fails.
    pub require_hardware: bool,
}

impl KeyGenConfig {
    /// Configuration for an ordinary, software-acceptable key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the permission tier.
    #[must_use]
    pub fn tier(mut self, tier: PermissionTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set whether hardware backing is required.
    #[must_use]
    pub fn require_hardware(mut self, require: bool) -> Self {
        self.require_hardware = require;
        self
    }

    /// Reject hardware requirements on a software-only backend.
    pub(crate) fn check_software(&self, backend: BackendType) -> Result<(), KeystoreError> {
        if self.require_hardware {
            return Err(KeystoreError::HardwareNotAvailable {
                reason: format!("Hardware required but {backend} store has no hardware support"),
            });
        }
        Ok(())
    }
}

/// Persistent mapping from [`KeyLabel`] to key pair.
///
/// ## Contract
///
/// - At most one key pair per label.
/// - Absence is never an error: `contains` returns `Ok(false)`, `fetch`
///   returns `Ok(None)` and `delete` returns `Ok(DeleteOutcome::NotFound)`.
///   Every other backend failure is reported as an error.
/// - [`KeyStore::generate`] never overwrites; an occupied label yields
///   [`KeystoreError::KeyAlreadyExists`].
/// - A generate that is abandoned by its caller leaves either a complete key
///   or no key.
///
/// Implementations are not required to serialize concurrent operations on
/// the same label; callers that need "create if absent" semantics must hold
/// a per-label lock around `fetch` + `generate`.
///
/// ## Example
///
/// ```rust,ignore
/// use secure_signing_keystore::{KeyGenConfig, KeyLabel, KeyStore, MemoryKeyStore};
///
/// async fn demo(store: &dyn KeyStore) -> Result<(), KeystoreError> {
///     let label = KeyLabel::new("app.device")?;
///     if store.fetch(&label).await?.is_none() {
///         store.generate(&label, &KeyGenConfig::new()).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Kind of storage behind this store.
    fn backend_type(&self) -> BackendType;

    /// Check whether a key pair is stored under `label`.
    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError>;

    /// Generate and persist a new P-256 key pair under `label`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A key already exists under `label`
    /// - The configuration cannot be satisfied by this backend
    /// - Persisting the key fails
    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError>;

    /// Look up the key pair stored under `label`.
    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError>;

    /// Remove the key pair stored under `label`.
    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError>;

    /// List every label in the store.
    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError>;
}
