//! Host-facing call surface.
//!
//! [`SecureSigning`] validates labels and decodes payloads before any store
//! access, then delegates to [`KeyManager`] and [`SigningService`].

use std::sync::Arc;

use secure_signing_keystore::{open_store, DeleteOutcome, KeyLabel, KeyStore};

use crate::config::SigningConfig;
use crate::encoding;
use crate::error::{Operation, SigningError};
use crate::keys::KeyManager;
use crate::signing::SigningService;
use crate::types::{
    DeleteResponse, ExistsResponse, KeyRequest, PublicKeyResponse, SignRequest,
    SignatureResponse,
};

/// Key management and signing service.
///
/// ```rust,ignore
/// use secure_signing_core::{KeyRequest, SecureSigning, SignRequest, SigningConfig};
///
/// let signing = SecureSigning::open(SigningConfig::default())?;
/// let key = signing
///     .create_key_pair_if_does_not_exist(&KeyRequest::new("com.example.device"))
///     .await?;
/// let sig = signing
///     .sign(&SignRequest::new("com.example.device", "aGVsbG8="))
///     .await?;
/// ```
pub struct SecureSigning {
    keys: Arc<KeyManager>,
    signer: SigningService,
    config: SigningConfig,
}

impl SecureSigning {
    /// Service over `store` with no user-presence provider.
    pub fn new(store: Arc<dyn KeyStore>, config: SigningConfig) -> Self {
        Self::with_key_manager(KeyManager::new(store), config)
    }

    /// Service over a configured [`KeyManager`].
    pub fn with_key_manager(keys: KeyManager, config: SigningConfig) -> Self {
        let keys = Arc::new(keys);
        Self {
            signer: SigningService::new(Arc::clone(&keys)),
            keys,
            config,
        }
    }

    /// Open the store selected by `config.store`.
    pub fn open(config: SigningConfig) -> Result<Self, SigningError> {
        let store = open_store(&config.store)
            .map_err(|e| SigningError::from_keystore(Operation::Query, e))?;

        tracing::info!(backend = %store.backend_type(), "SecureSigning: store opened");
        Ok(Self::new(store, config))
    }

    /// Underlying key manager.
    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Active configuration.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// `doesKeyPairExist`.
    ///
    /// Only a missing label is an error; backend faults are logged and
    /// reported as `false`.
    pub async fn does_key_pair_exist(
        &self,
        request: &KeyRequest,
    ) -> Result<ExistsResponse, SigningError> {
        let label = request.label()?;

        let is_existing = match self.keys.exists(&label).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(label = %label, kind = %e.kind(), error = %e, "doesKeyPairExist: backend fault reported as absent");
                false
            },
        };

        Ok(ExistsResponse { is_existing })
    }

    /// `generateKeyPair`. Fails if a key is already stored under the label.
    pub async fn generate_key_pair(
        &self,
        request: &KeyRequest,
    ) -> Result<PublicKeyResponse, SigningError> {
        let label = request.label()?;
        let config = self.config.key_gen();

        let handle = self.keys.generate(&label, &config).await?;
        Ok(public_key_response(&handle.public_key()))
    }

    /// `createKeyPairIfDoesNotExist`.
    pub async fn create_key_pair_if_does_not_exist(
        &self,
        request: &KeyRequest,
    ) -> Result<PublicKeyResponse, SigningError> {
        let label = request.label()?;
        let config = self.config.key_gen();

        let handle = self.keys.create_if_absent(&label, &config).await?;
        Ok(public_key_response(&handle.public_key()))
    }

    /// `getKeyPair`: public key of an existing key pair.
    pub async fn get_key_pair(
        &self,
        request: &KeyRequest,
    ) -> Result<PublicKeyResponse, SigningError> {
        let label = request.label()?;

        let handle = self
            .keys
            .fetch(&label)
            .await?
            .ok_or_else(|| SigningError::KeyNotFound {
                label: label.to_string(),
            })?;
        Ok(public_key_response(&handle.public_key()))
    }

    /// `sign`: base64 DER signature over the base64-decoded `data`.
    pub async fn sign(&self, request: &SignRequest) -> Result<SignatureResponse, SigningError> {
        let label = request.label()?;
        let message = encoding::decode_data(request.data.as_deref())?;

        let signature = self.signer.sign(&label, &message).await?;
        Ok(SignatureResponse {
            signature: encoding::encode(&signature),
        })
    }

    /// `deleteKeyPair`.
    ///
    /// Only a missing label is an error; backend faults are logged and
    /// reported as `NOT_FOUND`.
    pub async fn delete_key_pair(
        &self,
        request: &KeyRequest,
    ) -> Result<DeleteResponse, SigningError> {
        let label = request.label()?;

        let delete_status = match self.keys.delete(&label).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(label = %label, kind = %e.kind(), error = %e, "deleteKeyPair: backend fault reported as not found");
                DeleteOutcome::NotFound
            },
        };

        Ok(DeleteResponse { delete_status })
    }

    /// Labels of every stored key pair.
    pub async fn list_key_pairs(&self) -> Result<Vec<KeyLabel>, SigningError> {
        self.keys.labels().await
    }
}

fn public_key_response(public_key: &[u8]) -> PublicKeyResponse {
    PublicKeyResponse {
        public_key: encoding::encode(public_key),
    }
}
