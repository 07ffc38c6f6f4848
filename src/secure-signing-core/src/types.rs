//! Request and response types of the host call surface.
//!
//! Field names serialise in camelCase; binary values travel as standard
//! base64 with padding.

use secure_signing_keystore::{DeleteOutcome, KeyLabel};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SigningError};

/// Request naming a key pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRequest {
    /// Label of the key pair. Absent and empty are both rejected.
    #[serde(default)]
    pub prefixed_key: Option<String>,
}

impl KeyRequest {
    /// Request for `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            prefixed_key: Some(label.into()),
        }
    }

    /// Validated label.
    pub fn label(&self) -> Result<KeyLabel, SigningError> {
        parse_label(self.prefixed_key.as_deref())
    }
}

/// Request to sign a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Label of the signing key.
    #[serde(default)]
    pub prefixed_key: Option<String>,
    /// Base64 payload.
    #[serde(default)]
    pub data: Option<String>,
}

impl SignRequest {
    /// Request to sign the base64 `data` with `label`.
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            prefixed_key: Some(label.into()),
            data: Some(data.into()),
        }
    }

    /// Validated label.
    pub fn label(&self) -> Result<KeyLabel, SigningError> {
        parse_label(self.prefixed_key.as_deref())
    }
}

fn parse_label(raw: Option<&str>) -> Result<KeyLabel, SigningError> {
    match raw {
        Some(raw) if !raw.is_empty() => KeyLabel::new(raw).map_err(|_| SigningError::MissingKey),
        _ => Err(SigningError::MissingKey),
    }
}

/// Result of `doesKeyPairExist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsResponse {
    /// Whether a key pair is stored under the label.
    pub is_existing: bool,
}

/// Base64 public key of a key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// X9.63 uncompressed point, base64.
    pub public_key: String,
}

/// Base64 DER signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponse {
    /// ASN.1 DER `ECDSA-Sig-Value`, base64.
    pub signature: String,
}

/// Result of `deleteKeyPair`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// `DELETED` or `NOT_FOUND`.
    pub delete_status: DeleteOutcome,
}

/// Error object returned across the host boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-checkable kind.
    pub code: ErrorKind,
    /// Human-readable diagnostic.
    pub message: String,
}

impl From<&SigningError> for ErrorPayload {
    fn from(err: &SigningError) -> Self {
        Self {
            code: err.kind(),
            message: err.to_string(),
        }
    }
}
