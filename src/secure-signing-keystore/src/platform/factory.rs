//! Platform detection and store factory.
//!
//! Detects which backing store the current platform can offer and opens an
//! appropriate [`KeyStore`]. Falls back gracefully to the encrypted file
//! store, then to memory, when the OS credential store is unavailable.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::KeystoreError;
use crate::file::EncryptedFileKeyStore;
use crate::memory::MemoryKeyStore;
use crate::store::KeyStore;
use crate::types::BackendType;

/// Platform capabilities detected at runtime.
#[derive(Debug, Clone)]
pub struct PlatformCapabilities {
    /// Best available backend
    pub preferred_backend: BackendType,
    /// Whether an OS credential store is reachable
    pub has_os_keyring: bool,
    /// Whether the platform can gate key use on user presence
    pub supports_user_auth: bool,
}

impl PlatformCapabilities {
    /// Capabilities of a platform with nothing but software storage.
    #[must_use]
    pub fn software_only() -> Self {
        Self {
            preferred_backend: BackendType::EncryptedFile,
            has_os_keyring: false,
            supports_user_auth: false,
        }
    }
}

/// Detect the storage capabilities of the current platform.
pub fn detect_capabilities() -> PlatformCapabilities {
    if !cfg!(feature = "keyring-storage") {
        return PlatformCapabilities::software_only();
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        PlatformCapabilities {
            preferred_backend: BackendType::OsKeyring,
            has_os_keyring: true,
            supports_user_auth: true, // Touch ID / Face ID
        }
    }

    #[cfg(target_os = "windows")]
    {
        PlatformCapabilities {
            preferred_backend: BackendType::OsKeyring,
            has_os_keyring: true,
            supports_user_auth: true, // Windows Hello
        }
    }

    #[cfg(target_os = "linux")]
    {
        detect_linux_capabilities()
    }

    #[cfg(not(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "windows",
        target_os = "linux"
    )))]
    {
        PlatformCapabilities::software_only()
    }
}

#[cfg(target_os = "linux")]
fn detect_linux_capabilities() -> PlatformCapabilities {
    // Secret Service needs a session bus
    let has_session_bus = std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_some();

    if has_session_bus {
        PlatformCapabilities {
            preferred_backend: BackendType::OsKeyring,
            has_os_keyring: true,
            supports_user_auth: false,
        }
    } else {
        PlatformCapabilities::software_only()
    }
}

/// Which backend [`open_store`] should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
    /// OS keyring when reachable, else encrypted files when a directory is
    /// configured, else memory.
    #[default]
    Auto,
    /// OS keyring only.
    OsKeyring,
    /// Encrypted file store only.
    EncryptedFile,
    /// In-memory store.
    Memory,
}

/// Configuration for opening a key store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Backend selection.
    pub backend: BackendChoice,
    /// Service name for OS keyring entries.
    pub service: String,
    /// Directory for the encrypted file store.
    pub directory: Option<PathBuf>,
    /// Secret the file store encryption key is derived from.
    pub store_secret: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            service: "secure-signing".into(),
            directory: None,
            store_secret: None,
        }
    }
}

impl StoreConfig {
    /// Configuration selecting `backend`.
    #[must_use]
    pub fn new(backend: BackendChoice) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Set the OS keyring service name.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the encrypted file store directory.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Set the encrypted file store secret.
    #[must_use]
    pub fn store_secret(mut self, secret: impl Into<String>) -> Self {
        self.store_secret = Some(secret.into());
        self
    }
}

/// Open the store selected by `config`.
///
/// # Errors
///
/// Returns error if an explicitly requested backend cannot be opened. `Auto`
/// only fails if no backend at all can be opened.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyStore>, KeystoreError> {
    let caps = detect_capabilities();

    tracing::info!(
        backend = ?config.backend,
        preferred_backend = %caps.preferred_backend,
        has_os_keyring = caps.has_os_keyring,
        "open_store: starting"
    );

    match config.backend {
        BackendChoice::OsKeyring => open_os_keyring(config),
        BackendChoice::EncryptedFile => open_file_store(config),
        BackendChoice::Memory => {
            tracing::warn!("open_store: memory store selected, keys will not be persisted");
            Ok(Arc::new(MemoryKeyStore::new()))
        },
        BackendChoice::Auto => {
            if caps.has_os_keyring {
                match open_os_keyring(config) {
                    Ok(store) => return Ok(store),
                    Err(e) => {
                        tracing::warn!(
                            "OS keyring unavailable ({}), falling back to software store",
                            e
                        );
                    },
                }
            }

            if config.directory.is_some() {
                return open_file_store(config);
            }

            tracing::warn!(
                "open_store: no persistent backend available, using memory store. \
                 Keys will not survive a restart."
            );
            Ok(Arc::new(MemoryKeyStore::new()))
        },
    }
}

#[cfg(feature = "keyring-storage")]
fn open_os_keyring(config: &StoreConfig) -> Result<Arc<dyn KeyStore>, KeystoreError> {
    Ok(Arc::new(crate::keyring_storage::OsKeyringStore::new(
        &config.service,
    )?))
}

#[cfg(not(feature = "keyring-storage"))]
fn open_os_keyring(_config: &StoreConfig) -> Result<Arc<dyn KeyStore>, KeystoreError> {
    Err(KeystoreError::NoPlatformSupport)
}

fn open_file_store(config: &StoreConfig) -> Result<Arc<dyn KeyStore>, KeystoreError> {
    let directory = config
        .directory
        .clone()
        .ok_or_else(|| KeystoreError::InvalidConfiguration {
            reason: "encrypted file store requires a directory".into(),
        })?;

    let secret = match &config.store_secret {
        Some(secret) if !secret.is_empty() => secret.clone(),
        _ => {
            tracing::warn!(
                "open_store: no store secret configured, deriving file store key from service name"
            );
            config.service.clone()
        },
    };

    Ok(Arc::new(EncryptedFileKeyStore::open(directory, &secret)?))
}
