//! # secure-signing-core
//!
//! Label-addressed key management and ECDSA P-256 signing service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SecureSigning                             │
//! │        (label validation, base64 boundary, DTOs)            │
//! │                           │                                  │
//! │            ┌──────────────┴──────────────┐                   │
//! │            ▼                             ▼                   │
//! │  ┌──────────────────┐         ┌──────────────────┐          │
//! │  │   KeyManager     │◄────────│  SigningService  │          │
//! │  │ (per-label locks)│         │ (auth windows,   │          │
//! │  └──────────────────┘         │  DER signatures) │          │
//! │            │                  └──────────────────┘          │
//! │            ▼                                                 │
//! │  ┌──────────────────────────────────────────────────┐      │
//! │  │        Arc<dyn KeyStore> (keystore crate)         │      │
//! │  │   OS keyring / encrypted files / memory           │      │
//! │  └──────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **One key per label**: concurrent `createKeyPairIfDoesNotExist` calls
//!   for a label all return the same public key.
//! - **No overwrite**: `generateKeyPair` never replaces an existing key.
//! - **Validate first**: labels and payloads are checked before the store
//!   is touched.
//! - **Private keys stay put**: only public keys and signatures leave.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::pedantic)] // Too strict for production code
#![allow(clippy::doc_markdown)] // Allow product names without backticks
#![allow(clippy::missing_errors_doc)] // Error documentation not required
#![allow(clippy::missing_panics_doc)] // Panic documentation not required
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

pub mod config;
pub mod encoding;
pub mod error;
pub mod facade;
pub mod keys;
mod locks;
pub mod presence;
pub mod signing;
pub mod types;

pub use config::SigningConfig;
pub use error::{ErrorKind, Operation, SigningError};
pub use facade::SecureSigning;
pub use keys::KeyManager;
pub use presence::{FixedPresence, UserPresence};
pub use signing::{verify, SigningService};
pub use types::{
    DeleteResponse, ExistsResponse, ErrorPayload, KeyRequest, PublicKeyResponse, SignRequest,
    SignatureResponse,
};

pub use secure_signing_keystore::{
    BackendChoice, BackendType, DeleteOutcome, KeyGenConfig, KeyLabel, KeyPairHandle, KeyStore,
    KeystoreError, PermissionTier, StoreConfig,
};
