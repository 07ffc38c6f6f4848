//! Encrypted file key store.
//!
//! The software fallback for platforms without an OS credential store.
//! Each key pair is one file in the store directory, named by a keyed hash of
//! its label and sealed with XChaCha20-Poly1305. The encryption key is derived
//! from a caller-supplied store secret.
//!
//! WARNING: protection is only as strong as the store secret and the
//! directory's file permissions. There is no hardware binding.

// Allow deprecated from_slice until chacha20poly1305 upgrades to generic-array 1.x
#![allow(deprecated)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace, warn};

use crate::error::KeystoreError;
use crate::handle::KeyPairHandle;
use crate::record::PersistedKey;
use crate::store::{KeyGenConfig, KeyStore};
use crate::types::{BackendType, DeleteOutcome, KeyLabel};

/// XChaCha20-Poly1305 nonce size (24 bytes)
const NONCE_SIZE: usize = 24;

/// File extension of sealed key records.
const RECORD_EXTENSION: &str = "key";

/// Key store that keeps one encrypted record per label in a directory.
pub struct EncryptedFileKeyStore {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    encryption_key: [u8; 32],
}

impl EncryptedFileKeyStore {
    /// Open (creating if needed) a store in `dir`.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding the sealed records
    /// * `store_secret` - Secret the record encryption key is derived from
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, store_secret: &str) -> Result<Self, KeystoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut hasher = Sha256::new();
        hasher.update(b"secure-signing-store-key:");
        hasher.update(store_secret.as_bytes());
        let encryption_key: [u8; 32] = hasher.finalize().into();

        info!(dir = %dir.display(), "EncryptedFileKeyStore: opened");

        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                encryption_key,
            }),
        })
    }

    /// Directory holding the sealed records.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Path of the record for `label`.
    pub fn record_path(&self, label: &KeyLabel) -> PathBuf {
        self.inner.entry_path(label)
    }

    /// Write a legacy Ed25519 record under `label`.
    ///
    /// # Errors
    ///
    /// Returns error if `seed` is not 32 bytes, the label is taken, or the
    /// write fails.
    pub async fn import_ed25519(&self, label: &KeyLabel, seed: &[u8]) -> Result<(), KeystoreError> {
        let record = PersistedKey::ed25519(label.clone(), seed)?;
        let inner = Arc::clone(&self.inner);
        let label = label.clone();
        tokio::task::spawn_blocking(move || inner.write_new(&label, &record)).await?
    }
}

impl Inner {
    /// Hash the label together with the store key so file names reveal
    /// nothing about labels.
    fn entry_path(&self, label: &KeyLabel) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(self.encryption_key);
        hasher.update(label.as_bytes());
        let hash = hex::encode(hasher.finalize());

        self.dir.join(format!("{hash}.{RECORD_EXTENSION}"))
    }

    fn read_record(&self, path: &Path) -> Result<Option<PersistedKey>, KeystoreError> {
        let sealed = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(KeystoreError::retrieval(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            },
        };

        let plaintext = self.decrypt(&sealed)?;
        PersistedKey::from_bytes(&plaintext).map(Some)
    }

    fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        match self.read_record(&self.entry_path(label))? {
            Some(record) => record.into_handle(label).map(Some),
            None => Ok(None),
        }
    }

    /// Seal `record` and link it into place, failing if the label is taken.
    ///
    /// The record is fully written to a temporary file first, so readers see
    /// either no file or a complete one.
    fn write_new(&self, label: &KeyLabel, record: &PersistedKey) -> Result<(), KeystoreError> {
        let path = self.entry_path(label);
        let sealed = self.encrypt(&record.to_bytes()?)?;

        let mut suffix = [0u8; 8];
        OsRng.fill_bytes(&mut suffix);
        let tmp = self.dir.join(format!(".{}.tmp", hex::encode(suffix)));

        write_private(&tmp, &sealed).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            KeystoreError::generation(format!("failed to write key record: {e}"))
        })?;

        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => {
                debug!(label = %label, path = %path.display(), "EncryptedFileKeyStore: record written");
                Ok(())
            },
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(KeystoreError::KeyAlreadyExists {
                    label: label.to_string(),
                })
            },
            Err(e) => Err(KeystoreError::generation(format!(
                "failed to store key record: {e}"
            ))),
        }
    }

    fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        let path = self.entry_path(label);
        match fs::remove_file(&path) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(KeystoreError::deletion(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        let path = self.entry_path(label);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KeystoreError::retrieval(format!(
                "failed to stat {}: {e}",
                path.display()
            ))),
        }
    }

    fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            match self.read_record(&path) {
                Ok(Some(record)) if self.entry_path(record.label()) == path => {
                    labels.push(record.label().clone());
                },
                Ok(Some(record)) => {
                    warn!(
                        path = %path.display(),
                        label = %record.label(),
                        "EncryptedFileKeyStore: record stored under foreign path, skipping"
                    );
                },
                Ok(None) => {},
                Err(e) => {
                    warn!(path = %path.display(), "EncryptedFileKeyStore: unreadable record ({})", e);
                },
            }
        }
        labels.sort();
        Ok(labels)
    }

    /// Encrypt data using XChaCha20-Poly1305 authenticated encryption.
    ///
    /// Returns nonce || ciphertext (24 bytes nonce prepended to ciphertext).
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.encryption_key)
            .map_err(|e| KeystoreError::platform(format!("cipher init failed: {e}")))?;

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| KeystoreError::platform(format!("encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        trace!(
            plaintext_len = plaintext.len(),
            ciphertext_len = result.len(),
            "EncryptedFileKeyStore: sealed record"
        );

        Ok(result)
    }

    /// Decrypt data using XChaCha20-Poly1305 authenticated encryption.
    ///
    /// Expects nonce || ciphertext format.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        if data.len() < NONCE_SIZE {
            return Err(KeystoreError::corrupted(format!(
                "record too short ({} bytes)",
                data.len()
            )));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = XNonce::from_slice(nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(&self.encryption_key)
            .map_err(|e| KeystoreError::platform(format!("cipher init failed: {e}")))?;

        cipher.decrypt(nonce, ciphertext).map_err(|e| {
            warn!("EncryptedFileKeyStore: decryption failed (possible tampering): {}", e);
            KeystoreError::corrupted("record failed authentication")
        })
    }
}

/// Write `data` to a new file readable only by the owner.
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[async_trait]
impl KeyStore for EncryptedFileKeyStore {
    fn backend_type(&self) -> BackendType {
        BackendType::EncryptedFile
    }

    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        let inner = Arc::clone(&self.inner);
        let label = label.clone();
        tokio::task::spawn_blocking(move || inner.contains(&label)).await?
    }

    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        config.check_software(self.backend_type())?;

        let handle = KeyPairHandle::generate(label.clone(), config.tier);
        let record = PersistedKey::from_handle(&handle);

        // The blocking task runs to completion even if this future is dropped.
        let inner = Arc::clone(&self.inner);
        let owned = label.clone();
        tokio::task::spawn_blocking(move || inner.write_new(&owned, &record)).await??;

        info!(label = %label, "EncryptedFileKeyStore: key generated");
        Ok(handle)
    }

    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        let inner = Arc::clone(&self.inner);
        let label = label.clone();
        tokio::task::spawn_blocking(move || inner.fetch(&label)).await?
    }

    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        let inner = Arc::clone(&self.inner);
        let owned = label.clone();
        let outcome = tokio::task::spawn_blocking(move || inner.delete(&owned)).await??;

        if outcome == DeleteOutcome::Deleted {
            info!(label = %label, "EncryptedFileKeyStore: key deleted");
        }
        Ok(outcome)
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.labels()).await?
    }
}
