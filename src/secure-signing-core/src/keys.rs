//! Key lifecycle on top of an injected [`KeyStore`].
//!
//! [`KeyManager`] is the only component that touches the backing store. It
//! serialises mutations per label and classifies backend failures into
//! [`SigningError`] kinds according to the operation that hit them.

use std::sync::Arc;

use secure_signing_keystore::{
    BackendType, DeleteOutcome, KeyGenConfig, KeyLabel, KeyPairHandle, KeyStore, KeystoreError,
};

use crate::error::{Operation, SigningError};
use crate::locks::LabelLocks;
use crate::presence::{AuthWindows, UserPresence};

/// Label-addressed key pair lifecycle.
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    locks: LabelLocks,
    presence: Option<Arc<dyn UserPresence>>,
    windows: AuthWindows,
}

impl KeyManager {
    /// Manage the keys held by `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            locks: LabelLocks::new(),
            presence: None,
            windows: AuthWindows::new(),
        }
    }

    /// Register the platform user-presence provider.
    #[must_use]
    pub fn with_presence(mut self, presence: Arc<dyn UserPresence>) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Registered user-presence provider, if any.
    pub fn presence(&self) -> Option<&dyn UserPresence> {
        self.presence.as_deref()
    }

    /// Kind of storage behind this manager.
    pub fn backend_type(&self) -> BackendType {
        self.store.backend_type()
    }

    /// Whether a key pair is stored under `label`.
    pub async fn exists(&self, label: &KeyLabel) -> Result<bool, SigningError> {
        let found = self
            .store
            .contains(label)
            .await
            .map_err(|e| SigningError::from_keystore(Operation::Query, e))?;

        tracing::debug!(label = %label, found, "exists");
        Ok(found)
    }

    /// Generate a new key pair under `label`.
    ///
    /// Fails with `KeyGenerationError` if a key is already stored there; the
    /// existing key is left untouched.
    pub async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, SigningError> {
        self.check_generation(config)?;

        let _guard = self.locks.acquire(label).await?;
        self.generate_locked(label, config)
            .await
            .map_err(|e| SigningError::from_keystore(Operation::Generate, e))
    }

    /// Look up the key pair stored under `label`.
    pub async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, SigningError> {
        let handle = self
            .store
            .fetch(label)
            .await
            .map_err(|e| SigningError::from_keystore(Operation::Retrieve, e))?;

        tracing::debug!(label = %label, found = handle.is_some(), "fetch");
        Ok(handle)
    }

    /// Return the key pair under `label`, generating it first if absent.
    ///
    /// Concurrent callers for the same label all observe the same key pair;
    /// exactly one of them generates it. A key written behind our back while
    /// generating (an abandoned call's backend task, another process) is
    /// returned rather than reported as a failure.
    pub async fn create_if_absent(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, SigningError> {
        let _guard = self.locks.acquire(label).await?;

        if let Some(handle) = self.fetch(label).await? {
            tracing::debug!(label = %label, "create_if_absent: key already present");
            return Ok(handle);
        }

        self.check_generation(config)?;
        match self.generate_locked(label, config).await {
            Ok(handle) => Ok(handle),
            // Written by an abandoned earlier call or another process.
            Err(KeystoreError::KeyAlreadyExists { .. }) => {
                tracing::info!(label = %label, "create_if_absent: key appeared during generation");
                self.fetch(label).await?.ok_or_else(|| SigningError::KeyGeneration {
                    reason: format!("key under {label} reported present but cannot be read"),
                })
            },
            Err(e) => Err(SigningError::from_keystore(Operation::Generate, e)),
        }
    }

    /// Remove the key pair stored under `label`.
    pub async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, SigningError> {
        let _guard = self.locks.acquire(label).await?;

        let outcome = self
            .store
            .delete(label)
            .await
            .map_err(|e| SigningError::from_keystore(Operation::Delete, e))?;
        self.windows.forget(label)?;

        tracing::info!(label = %label, outcome = outcome.as_str(), "delete");
        Ok(outcome)
    }

    /// Every label currently stored.
    pub async fn labels(&self) -> Result<Vec<KeyLabel>, SigningError> {
        self.store
            .labels()
            .await
            .map_err(|e| SigningError::from_keystore(Operation::List, e))
    }

    /// Ensure the user may use `handle` now, prompting through the
    /// registered presence provider if its tier requires it.
    pub(crate) async fn authorize(&self, handle: &KeyPairHandle) -> Result<(), SigningError> {
        self.windows.authorize(handle, self.presence()).await
    }

    async fn generate_locked(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        let handle = self.store.generate(label, config).await?;

        tracing::info!(
            label = %label,
            backend = %self.store.backend_type(),
            auth_required = config.tier.requires_authentication(),
            "generated key pair"
        );
        Ok(handle)
    }

    fn check_generation(&self, config: &KeyGenConfig) -> Result<(), SigningError> {
        if !config.tier.requires_authentication() {
            return Ok(());
        }

        match self.presence() {
            Some(presence) if presence.secure_lock_screen_enabled() => Ok(()),
            _ => Err(SigningError::SecureLockScreenDisabled),
        }
    }
}
