//! User presence for authentication-required keys.
//!
//! Hosts plug in their platform prompt (biometrics, device PIN) through
//! [`UserPresence`]. A confirmation authorises one key for the validity
//! window of its
//! [`PermissionTier`](secure_signing_keystore::PermissionTier).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secure_signing_keystore::{KeyLabel, KeyPairHandle};

use crate::error::SigningError;
use crate::locks::LabelLocks;

/// Platform hook for confirming the user is present.
#[async_trait]
pub trait UserPresence: Send + Sync {
    /// Whether the device has a secure lock screen configured.
    fn secure_lock_screen_enabled(&self) -> bool;

    /// Ask the user to confirm use of the key stored under `label`.
    ///
    /// Returns `Ok(false)` when the user declines or cancels.
    async fn confirm(&self, label: &KeyLabel, reason: &str) -> Result<bool, SigningError>;
}

/// Presence provider with a fixed answer.
///
/// Used by the CLI (`--assume-present`) and by tests.
#[derive(Debug)]
pub struct FixedPresence {
    lock_screen: bool,
    approve: bool,
    prompts: AtomicUsize,
}

impl FixedPresence {
    /// Lock screen configured, every prompt approved.
    pub fn approving() -> Self {
        Self::new(true, true)
    }

    /// Lock screen configured, every prompt declined.
    pub fn declining() -> Self {
        Self::new(true, false)
    }

    /// No lock screen configured.
    pub fn without_lock_screen() -> Self {
        Self::new(false, false)
    }

    fn new(lock_screen: bool, approve: bool) -> Self {
        Self {
            lock_screen,
            approve,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Number of prompts shown so far.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserPresence for FixedPresence {
    fn secure_lock_screen_enabled(&self) -> bool {
        self.lock_screen
    }

    async fn confirm(&self, _label: &KeyLabel, _reason: &str) -> Result<bool, SigningError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.approve)
    }
}

struct Confirmation {
    public_key: Vec<u8>,
    expires_at: Instant,
}

/// Most recent confirmation per label.
///
/// Confirmations are bound to the key's public key, so a label that was
/// deleted and regenerated needs a fresh one. At most one prompt per label
/// is outstanding; concurrent signers wait for it and reuse the answer.
#[derive(Default)]
pub(crate) struct AuthWindows {
    confirmed: Mutex<HashMap<KeyLabel, Confirmation>>,
    prompts: LabelLocks,
}

impl AuthWindows {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ensure the user may use `handle` right now, prompting if needed.
    pub(crate) async fn authorize(
        &self,
        handle: &KeyPairHandle,
        presence: Option<&dyn UserPresence>,
    ) -> Result<(), SigningError> {
        let Some(validity) = handle.tier().auth_validity() else {
            return Ok(());
        };

        let label = handle.label();
        let public_key = handle.public_key();
        if self.is_fresh(label, &public_key)? {
            tracing::debug!(label = %label, "authorize: within validity window");
            return Ok(());
        }

        let Some(presence) = presence else {
            tracing::warn!(label = %label, "authorize: no user presence provider");
            return Err(SigningError::UserNotAuthenticated);
        };

        let _prompt = self.prompts.acquire(label).await?;
        if self.is_fresh(label, &public_key)? {
            tracing::debug!(label = %label, "authorize: confirmed by concurrent prompt");
            return Ok(());
        }

        if !presence.confirm(label, "Sign with protected key").await? {
            tracing::info!(label = %label, "authorize: user declined");
            return Err(SigningError::UserNotAuthenticated);
        }

        self.record(label, public_key, validity)
    }

    /// Drop any confirmation held for `label`.
    pub(crate) fn forget(&self, label: &KeyLabel) -> Result<(), SigningError> {
        let mut confirmed = self.confirmed.lock().map_err(|_| poisoned())?;
        confirmed.remove(label);
        Ok(())
    }

    fn is_fresh(&self, label: &KeyLabel, public_key: &[u8]) -> Result<bool, SigningError> {
        let confirmed = self.confirmed.lock().map_err(|_| poisoned())?;
        Ok(confirmed
            .get(label)
            .is_some_and(|c| c.public_key == public_key && Instant::now() < c.expires_at))
    }

    fn record(
        &self,
        label: &KeyLabel,
        public_key: Vec<u8>,
        validity: Duration,
    ) -> Result<(), SigningError> {
        let now = Instant::now();
        let mut confirmed = self.confirmed.lock().map_err(|_| poisoned())?;
        confirmed.retain(|_, c| c.expires_at > now);

        if let Some(expires_at) = now.checked_add(validity) {
            confirmed.insert(
                label.clone(),
                Confirmation {
                    public_key,
                    expires_at,
                },
            );
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.confirmed.lock().map(|c| c.len()).unwrap_or(0)
    }
}

fn poisoned() -> SigningError {
    SigningError::Os {
        reason: "authentication window table poisoned".into(),
    }
}
