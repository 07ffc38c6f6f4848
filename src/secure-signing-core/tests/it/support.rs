//! Store doubles shared by the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secure_signing_core::{
    BackendType, DeleteOutcome, KeyGenConfig, KeyLabel, KeyPairHandle, KeyStore, KeystoreError,
};
use secure_signing_keystore::MemoryKeyStore;

/// Memory store that counts calls and widens race windows.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryKeyStore,
    calls: AtomicUsize,
    generated: AtomicUsize,
    delay: Duration,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sleep for `delay` inside every lookup and generation.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl KeyStore for CountingStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        self.pause().await;
        self.inner.contains(label).await
    }

    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        self.pause().await;
        let handle = self.inner.generate(label, config).await?;
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        self.pause().await;
        self.inner.fetch(label).await
    }

    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        self.pause().await;
        self.inner.delete(label).await
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        self.pause().await;
        self.inner.labels().await
    }
}

/// Memory store that finishes generation on a detached task, the way
/// blocking backends outlive a dropped caller.
#[derive(Default)]
pub struct DetachedStore {
    inner: Arc<MemoryKeyStore>,
    generated: Arc<AtomicUsize>,
    delay: Duration,
}

impl DetachedStore {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyStore for DetachedStore {
    fn backend_type(&self) -> BackendType {
        BackendType::EncryptedFile
    }

    async fn contains(&self, label: &KeyLabel) -> Result<bool, KeystoreError> {
        self.inner.contains(label).await
    }

    async fn generate(
        &self,
        label: &KeyLabel,
        config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        let inner = Arc::clone(&self.inner);
        let generated = Arc::clone(&self.generated);
        let delay = self.delay;
        let label = label.clone();
        let config = config.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let handle = inner.generate(&label, &config).await?;
            generated.fetch_add(1, Ordering::SeqCst);
            Ok::<_, KeystoreError>(handle)
        })
        .await?
    }

    async fn fetch(&self, label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        self.inner.fetch(label).await
    }

    async fn delete(&self, label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        self.inner.delete(label).await
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        self.inner.labels().await
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

fn fault() -> KeystoreError {
    KeystoreError::RetrievalFailed {
        reason: "backend offline".into(),
    }
}

#[async_trait]
impl KeyStore for FailingStore {
    fn backend_type(&self) -> BackendType {
        BackendType::OsKeyring
    }

    async fn contains(&self, _label: &KeyLabel) -> Result<bool, KeystoreError> {
        Err(fault())
    }

    async fn generate(
        &self,
        _label: &KeyLabel,
        _config: &KeyGenConfig,
    ) -> Result<KeyPairHandle, KeystoreError> {
        Err(KeystoreError::KeyGenerationFailed {
            reason: "backend offline".into(),
        })
    }

    async fn fetch(&self, _label: &KeyLabel) -> Result<Option<KeyPairHandle>, KeystoreError> {
        Err(fault())
    }

    async fn delete(&self, _label: &KeyLabel) -> Result<DeleteOutcome, KeystoreError> {
        Err(KeystoreError::DeletionFailed {
            reason: "backend offline".into(),
        })
    }

    async fn labels(&self) -> Result<Vec<KeyLabel>, KeystoreError> {
        Err(fault())
    }
}
