//! Serialized form of a key pair for persistent backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KeystoreError;
use crate::handle::{KeyMaterial, KeyPairHandle};
use crate::types::{KeyAlgorithm, KeyLabel, PermissionTier};

/// Current record format version.
const RECORD_VERSION: u32 = 1;

/// A key pair as written to disk or to the OS keyring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedKey {
    version: u32,
    label: KeyLabel,
    algorithm: KeyAlgorithm,
    tier: PermissionTier,
    /// Hex-encoded private scalar or seed.
    secret: String,
    /// Hex-encoded public key, checked against the secret on load.
    public_key: String,
    created_at: DateTime<Utc>,
}

impl PersistedKey {
    pub(crate) fn from_handle(handle: &KeyPairHandle) -> Self {
        Self {
            version: RECORD_VERSION,
            label: handle.label().clone(),
            algorithm: handle.algorithm(),
            tier: handle.tier(),
            secret: hex::encode(handle.material().secret_bytes()),
            public_key: hex::encode(handle.public_key()),
            created_at: handle.created_at(),
        }
    }

    /// Legacy Ed25519 record, as written by older tooling.
    pub(crate) fn ed25519(label: KeyLabel, seed: &[u8]) -> Result<Self, KeystoreError> {
        let material = KeyMaterial::from_secret(KeyAlgorithm::Ed25519, seed)?;
        let handle = KeyPairHandle::new(label, PermissionTier::Ordinary, Utc::now(), material);
        Ok(Self::from_handle(&handle))
    }

    /// Rebuild the handle, refusing records that belong to another label
    /// or whose public key does not match the secret.
    pub(crate) fn into_handle(self, expected: &KeyLabel) -> Result<KeyPairHandle, KeystoreError> {
        if self.version != RECORD_VERSION {
            return Err(KeystoreError::corrupted(format!(
                "unsupported record version {}",
                self.version
            )));
        }

        if &self.label != expected {
            return Err(KeystoreError::corrupted(format!(
                "record for '{}' found under '{}'",
                self.label, expected
            )));
        }

        let secret = hex::decode(&self.secret)
            .map_err(|e| KeystoreError::corrupted(format!("secret is not hex: {e}")))?;
        let material = KeyMaterial::from_secret(self.algorithm, &secret)?;
        let handle = KeyPairHandle::new(self.label, self.tier, self.created_at, material);

        if hex::encode(handle.public_key()) != self.public_key {
            return Err(KeystoreError::corrupted(
                "stored public key does not match private key",
            ));
        }

        Ok(handle)
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, KeystoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, KeystoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| KeystoreError::corrupted(format!("unreadable record: {e}")))
    }

    pub(crate) fn label(&self) -> &KeyLabel {
        &self.label
    }
}
