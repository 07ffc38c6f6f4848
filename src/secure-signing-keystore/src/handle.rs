//! Key pair handles.
//!
//! A [`KeyPairHandle`] is what a store hands out for a label. It can derive
//! the public key and produce signatures, but has no accessor for the
//! private material outside this crate.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use rand_core::OsRng;

use crate::error::KeystoreError;
use crate::types::{KeyAlgorithm, KeyLabel, PermissionTier};

/// Private key material held by a store.
pub(crate) enum KeyMaterial {
    EcdsaP256(SigningKey),
    Ed25519(Ed25519SigningKey),
}

impl KeyMaterial {
    pub(crate) fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::EcdsaP256(_) => KeyAlgorithm::EcdsaP256,
            Self::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// Rebuild material from its raw secret bytes.
    pub(crate) fn from_secret(
        algorithm: KeyAlgorithm,
        secret: &[u8],
    ) -> Result<Self, KeystoreError> {
        if secret.len() != algorithm.secret_size() {
            return Err(KeystoreError::InvalidKey {
                reason: format!(
                    "{algorithm} secret must be {} bytes, got {} bytes",
                    algorithm.secret_size(),
                    secret.len()
                ),
            });
        }

        match algorithm {
            KeyAlgorithm::EcdsaP256 => SigningKey::from_slice(secret)
                .map(Self::EcdsaP256)
                .map_err(|e| KeystoreError::InvalidKey {
                    reason: format!("Failed to parse P-256 key: {e}"),
                }),
            KeyAlgorithm::Ed25519 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(secret);
                Ok(Self::Ed25519(Ed25519SigningKey::from_bytes(&seed)))
            },
        }
    }

    pub(crate) fn secret_bytes(&self) -> Vec<u8> {
        match self {
            Self::EcdsaP256(key) => key.to_bytes().to_vec(),
            Self::Ed25519(key) => key.to_bytes().to_vec(),
        }
    }

    fn public_key(&self) -> Vec<u8> {
        match self {
            Self::EcdsaP256(key) => key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Self::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
        }
    }
}

/// Handle to a stored key pair.
///
/// Cloning a handle shares the underlying material; it never copies it out.
#[derive(Clone)]
pub struct KeyPairHandle {
    label: KeyLabel,
    tier: PermissionTier,
    created_at: DateTime<Utc>,
    material: Arc<KeyMaterial>,
}

impl KeyPairHandle {
    pub(crate) fn new(
        label: KeyLabel,
        tier: PermissionTier,
        created_at: DateTime<Utc>,
        material: KeyMaterial,
    ) -> Self {
        Self {
            label,
            tier,
            created_at,
            material: Arc::new(material),
        }
    }

    /// Generate fresh P-256 material for `label`.
    pub(crate) fn generate(label: KeyLabel, tier: PermissionTier) -> Self {
        Self::new(
            label,
            tier,
            Utc::now(),
            KeyMaterial::EcdsaP256(SigningKey::random(&mut OsRng)),
        )
    }

    pub(crate) fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Label this key pair is stored under.
    #[must_use]
    pub fn label(&self) -> &KeyLabel {
        &self.label
    }

    /// Algorithm family of the stored material.
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.material.algorithm()
    }

    /// Permission tier the key was created with.
    #[must_use]
    pub fn tier(&self) -> PermissionTier {
        self.tier
    }

    /// When the key pair was generated.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the key can produce signatures for `algorithm`.
    #[must_use]
    pub fn supports(&self, algorithm: KeyAlgorithm) -> bool {
        self.algorithm() == algorithm
    }

    /// Derived public key.
    ///
    /// P-256 keys export the X9.63 uncompressed point (65 bytes);
    /// Ed25519 keys export the 32-byte compressed point.
    #[must_use]
    pub fn public_key(&self) -> Vec<u8> {
        self.material.public_key()
    }

    /// ECDSA P-256 signature over SHA-256(`message`), ASN.1 DER encoded.
    ///
    /// Nonces are derived per RFC 6979, so the same key and message always
    /// give the same signature.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::NotSupported`] for non-P-256 material and
    /// [`KeystoreError::PlatformError`] if the signature operation fails.
    pub fn sign_ecdsa_sha256_der(&self, message: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let KeyMaterial::EcdsaP256(key) = self.material.as_ref() else {
            return Err(KeystoreError::NotSupported {
                operation: format!("ECDSA-P256-SHA256 signing with {} key", self.algorithm()),
            });
        };

        let signature: Signature = key
            .try_sign(message)
            .map_err(|e| KeystoreError::platform(format!("ECDSA signing failed: {e}")))?;

        Ok(signature.to_der().as_bytes().to_vec())
    }
}

impl fmt::Debug for KeyPairHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairHandle")
            .field("label", &self.label)
            .field("algorithm", &self.algorithm())
            .field("tier", &self.tier)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
