//! # secure-signing-keystore
//!
//! Label-addressed key pair storage for the secure-signing service.
//!
//! Every backend implements the [`KeyStore`] trait: one ECDSA P-256 key pair
//! per opaque [`KeyLabel`], with existence checks, generation, lookup and
//! deletion. Private material never leaves a store in exportable form; callers
//! only ever hold a [`KeyPairHandle`].
//!
//! ## Backends
//!
//! | Backend | Persistence | Protection at rest |
//! |---------|-------------|--------------------|
//! | `OsKeyringStore` | OS credential store | Keychain / Credential Manager / Secret Service |
//! | `EncryptedFileKeyStore` | Directory of sealed records | XChaCha20-Poly1305 |
//! | `MemoryKeyStore` | None | None (tests, last resort) |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use secure_signing_keystore::{open_store, KeyGenConfig, KeyLabel, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = open_store(&StoreConfig::default())?;
//!     let label = KeyLabel::new("com.example.device")?;
//!
//!     let handle = store.generate(&label, &KeyGenConfig::new()).await?;
//!     let signature = handle.sign_ecdsa_sha256_der(b"data to sign")?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::pedantic)] // Too strict for production code
#![allow(clippy::doc_markdown)] // Allow product names without backticks
#![allow(clippy::missing_errors_doc)] // Error documentation not required
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

mod error;
mod file;
mod handle;
mod memory;
mod record;
mod store;
mod types;

/// Platform store detection and selection.
pub mod platform;

/// OS keyring integration for cross-platform key storage.
#[cfg(feature = "keyring-storage")]
pub mod keyring_storage;

pub use error::KeystoreError;
pub use file::EncryptedFileKeyStore;
pub use handle::KeyPairHandle;
pub use memory::MemoryKeyStore;
pub use store::{KeyGenConfig, KeyStore};
pub use types::{BackendType, DeleteOutcome, KeyAlgorithm, KeyLabel, PermissionTier};

pub use platform::{
    detect_capabilities, open_store, BackendChoice, PlatformCapabilities, StoreConfig,
};

#[cfg(feature = "keyring-storage")]
pub use keyring_storage::OsKeyringStore;
