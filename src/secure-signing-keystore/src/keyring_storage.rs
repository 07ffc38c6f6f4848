//! Integration with the `keyring` crate for OS credential storage.
//!
//! The keyring crate provides:
//! - macOS Keychain
//! - Windows Credential Manager
//! - Linux Secret Service (via D-Bus)
//!
//! Each label is one credential entry (`service`, `label`) holding the
//! serialized key record. Signing happens in software with the loaded key,
//! so the OS store protects keys at rest only.

use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;

use crate::error::KeystoreError;
use crate::handle::KeyPairHandle;
use crate::record::PersistedKey;
use crate::store::{KeyGenConfig, KeyStore};
use crate::types::{BackendType, DeleteOutcome, KeyLabel};

/// Key store backed by the OS credential store.
///
/// The OS API has no atomic "create if absent"; `generate` checks for an
/// existing entry first, which is race-free only when callers serialize
/// operations per label.
pub struct OsKeyringStore {
    service: Arc<str>,
}

impl OsKeyringStore {
    /// Create a store whose entries live under `service`.
    ///
    /// # Errors
    ///
    /// Returns error if the OS credential store cannot be reached.
    pub fn new(service: &str) -> Result<Self, KeystoreError> {
        if service.is_empty() {
            return Err(KeystoreError::platform("Keyring service name must not be empty"));
        }

        // Probe once so an unusable keyring fails here rather than on first use.
        Entry::new(service, "secure-signing-availability").map_err(|e| {
            KeystoreError::HardwareNotAvailable {
                reason: format!("Keyring init failed: {e}"),
            }
        })?;

        tracing::info!(service = %service, "OsKeyringStore: opened");
        Ok(Self {
            service: Arc::from(service),
        })
    }

    /// Service name entries are filed under.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(service: &str, label: &KeyLabel) -> Result<Entry, KeystoreError> {
        Entry::new(service, label.as_str()).map_err(|e| KeystoreError::PlatformError {
            message: format!("Keyring entry for '{label}' unavailable: {e}"),
        })
    }

    fn read(service: &str, label: &KeyLabel) -> Result<Option<Vec<u8>>, KeystoreError> {
        match Self::entry(service, label)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeystoreError::retrieval(format!("Failed to get key: {e}"))),
        }
    }
}

#[async_trait]
impl KeyStore for OsKeyringStore {
    fn backend_type(&self) -> BackendType {
        BackendType::OsKeyring
    }

    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        let service = Arc::clone(&self.service);
        let label = label.clone();
        let secret = tokio::task::spawn_blocking(move || Self::read(&service, &label)).await??;
        Ok(secret.is_some())
    }

    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        config.check_software(self.backend_type())?;

        let handle = KeyPairHandle::generate(label.clone(), config.tier);
        let bytes = PersistedKey::from_handle(&handle).to_bytes()?;

        let service = Arc::clone(&self.service);
        let owned = label.clone();
        tokio::task::spawn_blocking(move || {
            if Self::read(&service, &owned)?.is_some() {
                return Err(KeystoreError::KeyAlreadyExists {
                    label: owned.to_string(),
                });
            }
            Self::entry(&service, &owned)?
                .set_secret(&bytes)
                .map_err(|e| KeystoreError::generation(format!("Failed to store key: {e}")))
        })
        .await??;

        tracing::info!(label = %label, service = %self.service, "OsKeyringStore: key generated");
        Ok(handle)
    }

    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        let service = Arc::clone(&self.service);
        let owned = label.clone();
        let secret = tokio::task::spawn_blocking(move || Self::read(&service, &owned)).await??;

        match secret {
            Some(bytes) => PersistedKey::from_bytes(&bytes)?.into_handle(label).map(Some),
            None => Ok(None),
        }
    }

    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        let service = Arc::clone(&self.service);
        let owned = label.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            match Self::entry(&service, &owned)?.delete_credential() {
                Ok(()) => Ok(DeleteOutcome::Deleted),
                Err(keyring::Error::NoEntry) => Ok(DeleteOutcome::NotFound),
                Err(e) => Err(KeystoreError::deletion(format!("Failed to delete key: {e}"))),
            }
        })
        .await??;

        if outcome == DeleteOutcome::Deleted {
            tracing::info!(label = %label, service = %self.service, "OsKeyringStore: key deleted");
        }
        Ok(outcome)
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        Err(KeystoreError::NotSupported {
            operation: "listing OS keyring entries".into(),
        })
    }
}
