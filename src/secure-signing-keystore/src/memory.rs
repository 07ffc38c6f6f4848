//! In-memory key store.
//!
//! WARNING: keys live only as long as the process. Nothing is persisted.
//!
//! Use only for:
//! - Tests (the injectable double for platform stores)
//! - Platforms where no persistent backend can be opened

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::KeystoreError;
use crate::handle::{KeyMaterial, KeyPairHandle};
use crate::store::{KeyGenConfig, KeyStore};
use crate::types::{BackendType, DeleteOutcome, KeyAlgorithm, KeyLabel, PermissionTier};

/// Non-persistent key store backed by a `HashMap`.
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<KeyLabel, KeyPairHandle>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        tracing::debug!("MemoryKeyStore: created (keys are not persisted)");
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Place a legacy Ed25519 key under `label`.
    ///
    /// Such keys can be looked up and deleted but are refused for signing.
    ///
    /// # Errors
    ///
    /// Returns error if `seed` is not exactly 32 bytes or the label is taken.
    pub fn import_ed25519(&self, label: &KeyLabel, seed: &[u8]) -> Result<(), KeystoreError> {
        let material = KeyMaterial::from_secret(KeyAlgorithm::Ed25519, seed)?;
        let handle =
            KeyPairHandle::new(label.clone(), PermissionTier::Ordinary, Utc::now(), material);

        let mut keys = self.keys.write().map_err(|_| KeystoreError::poisoned())?;
        if keys.contains_key(label) {
            return Err(KeystoreError::KeyAlreadyExists {
                label: label.to_string(),
            });
        }
        keys.insert(label.clone(), handle);

        tracing::info!(label = %label, "MemoryKeyStore: Ed25519 key imported");
        Ok(())
    }

    /// Number of stored key pairs.
    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    /// Whether the store holds no key pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        let keys = self.keys.read().map_err(|_| KeystoreError::poisoned())?;
        Ok(keys.contains_key(label))
    }

    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        config.check_software(self.backend_type())?;

        let mut keys = self.keys.write().map_err(|_| KeystoreError::poisoned())?;
        if keys.contains_key(label) {
            return Err(KeystoreError::KeyAlreadyExists {
                label: label.to_string(),
            });
        }

        let handle = KeyPairHandle::generate(label.clone(), config.tier);
        keys.insert(label.clone(), handle.clone());

        tracing::info!(label = %label, "MemoryKeyStore: key generated");
        Ok(handle)
    }

    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        let keys = self.keys.read().map_err(|_| KeystoreError::poisoned())?;
        Ok(keys.get(label).cloned())
    }

    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        let mut keys = self.keys.write().map_err(|_| KeystoreError::poisoned())?;
        match keys.remove(label) {
            Some(_) => {
                tracing::info!(label = %label, "MemoryKeyStore: key deleted");
                Ok(DeleteOutcome::Deleted)
            },
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        let keys = self.keys.read().map_err(|_| KeystoreError::poisoned())?;
        let mut labels: Vec<KeyLabel> = keys.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }
}
