//! Per-label mutual exclusion.
//!
//! Operations that mutate the store for a label (`generate`,
//! `create_if_absent`, `delete`) hold that label's lock for their whole
//! duration. Distinct labels never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use secure_signing_keystore::KeyLabel;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::SigningError;

/// Guard for one label; dropping it releases the label.
pub(crate) type LabelGuard = OwnedMutexGuard<()>;

/// Table of label locks, created on first use and pruned once unused.
#[derive(Default)]
pub(crate) struct LabelLocks {
    table: Mutex<HashMap<KeyLabel, Weak<AsyncMutex<()>>>>,
}

impl LabelLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `label`.
    pub(crate) async fn acquire(&self, label: &KeyLabel) -> Result<LabelGuard, SigningError> {
        let lock = self.lock_for(label)?;
        Ok(lock.lock_owned().await)
    }

    fn lock_for(&self, label: &KeyLabel) -> Result<Arc<AsyncMutex<()>>, SigningError> {
        let mut table = self.table.lock().map_err(|_| SigningError::Os {
            reason: "label lock table poisoned".into(),
        })?;

        if let Some(lock) = table.get(label).and_then(Weak::upgrade) {
            return Ok(lock);
        }

        table.retain(|_, weak| weak.strong_count() > 0);

        let lock = Arc::new(AsyncMutex::new(()));
        table.insert(label.clone(), Arc::downgrade(&lock));
        Ok(lock)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table
            .lock()
            .map(|t| t.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}
