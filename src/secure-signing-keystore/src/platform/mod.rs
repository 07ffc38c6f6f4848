//! Platform store selection.
//!
//! Each platform offers a different persistent repository:
//! - macOS/iOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (when a session bus is present)
//! - Fallback: encrypted files, then memory

mod factory;

pub use factory::{
    detect_capabilities, open_store, BackendChoice, PlatformCapabilities, StoreConfig,
};
