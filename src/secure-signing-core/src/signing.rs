//! ECDSA P-256 signing with stored keys.

use std::sync::Arc;

use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use secure_signing_keystore::{KeyAlgorithm, KeyLabel};

use crate::error::{Operation, SigningError};
use crate::keys::KeyManager;

/// Produces signatures with the key pairs of a [`KeyManager`].
pub struct SigningService {
    keys: Arc<KeyManager>,
}

impl SigningService {
    /// Sign with the keys managed by `keys`.
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// Key manager this service signs with.
    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Sign SHA-256(`message`) with the key under `label`.
    ///
    /// Returns the ASN.1 DER `ECDSA-Sig-Value`. An empty message is valid.
    /// Keys of the authentication-required tier may suspend here waiting
    /// for user confirmation.
    pub async fn sign(&self, label: &KeyLabel, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let handle = self
            .keys
            .fetch(label)
            .await?
            .ok_or_else(|| SigningError::KeyNotFound {
                label: label.to_string(),
            })?;

        if !handle.supports(KeyAlgorithm::EcdsaP256) {
            tracing::warn!(
                label = %label,
                algorithm = %handle.algorithm(),
                "sign: stored key cannot produce ECDSA-P256-SHA256 signatures"
            );
            return Err(SigningError::signing(format!(
                "algorithm not supported: key under {label} is {}",
                handle.algorithm()
            )));
        }

        self.keys.authorize(&handle).await?;

        let signature = handle
            .sign_ecdsa_sha256_der(message)
            .map_err(|e| SigningError::from_keystore(Operation::Sign, e))?;

        tracing::debug!(label = %label, message_len = message.len(), "signed message");
        Ok(signature)
    }
}

/// Check a DER ECDSA P-256 signature over SHA-256(`message`).
///
/// `public_key` is a SEC1 encoded point (compressed or uncompressed).
/// Returns `Ok(false)` for a well-formed signature that does not verify;
/// malformed inputs are `InvalidData`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, SigningError> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| SigningError::invalid_data(format!("public key is not a P-256 point: {e}")))?;
    let signature = Signature::from_der(signature)
        .map_err(|e| SigningError::invalid_data(format!("signature is not DER ECDSA: {e}")))?;

    Ok(key.verify(message, &signature).is_ok())
}
