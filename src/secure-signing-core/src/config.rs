//! Configuration for the signing service.

use secure_signing_keystore::{BackendChoice, KeyGenConfig, PermissionTier, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::error::SigningError;

/// Configuration for [`SecureSigning`](crate::SecureSigning).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SigningConfig {
    /// Backing store selection.
    pub store: StoreConfig,
    /// Tier given to keys created through the facade.
    pub default_tier: PermissionTier,
    /// Refuse to create keys on software-only stores.
    pub require_hardware: bool,
}

impl SigningConfig {
    /// Default configuration over `backend`.
    #[must_use]
    pub fn new(backend: BackendChoice) -> Self {
        Self {
            store: StoreConfig::new(backend),
            ..Default::default()
        }
    }

    /// Set the backing store configuration.
    #[must_use]
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Set the tier of newly created keys.
    #[must_use]
    pub fn default_tier(mut self, tier: PermissionTier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Set whether hardware backing is required.
    #[must_use]
    pub fn require_hardware(mut self, require: bool) -> Self {
        self.require_hardware = require;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, SigningError> {
        serde_json::from_str(json).map_err(|e| SigningError::Unknown {
            reason: format!("invalid configuration: {e}"),
        })
    }

    /// Generation parameters for keys created through the facade.
    pub(crate) fn key_gen(&self) -> KeyGenConfig {
        KeyGenConfig::new()
            .tier(self.default_tier)
            .require_hardware(self.require_hardware)
    }
}
