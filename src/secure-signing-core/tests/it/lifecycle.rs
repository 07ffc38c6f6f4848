//! End-to-end behaviour of the host call surface.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use secure_signing_core::{
    BackendChoice, DeleteOutcome, ErrorKind, FixedPresence, KeyManager, KeyRequest,
    PermissionTier, SecureSigning, SignRequest, SigningConfig, StoreConfig,
};
use secure_signing_keystore::MemoryKeyStore;

use crate::support::CountingStore;

fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn verifies(public_key_b64: &str, message: &[u8], signature_b64: &str) -> bool {
    let pk = STANDARD.decode(public_key_b64).unwrap();
    let der = STANDARD.decode(signature_b64).unwrap();
    let key = VerifyingKey::from_sec1_bytes(&pk).unwrap();
    let sig = Signature::from_der(&der).unwrap();
    key.verify(message, &sig).is_ok()
}

#[tokio::test]
async fn full_lifecycle() {
    let signing = SecureSigning::new(CountingStore::new(), SigningConfig::default());
    let req = KeyRequest::new("com.example.device");

    assert!(!signing.does_key_pair_exist(&req).await.unwrap().is_existing);

    let created = signing.create_key_pair_if_does_not_exist(&req).await.unwrap();
    assert!(signing.does_key_pair_exist(&req).await.unwrap().is_existing);

    let again = signing.create_key_pair_if_does_not_exist(&req).await.unwrap();
    assert_eq!(again, created);

    let sig = signing
        .sign(&SignRequest::new("com.example.device", b64(b"hello world")))
        .await
        .unwrap();
    assert!(verifies(&created.public_key, b"hello world", &sig.signature));

    assert_eq!(
        signing.delete_key_pair(&req).await.unwrap().delete_status,
        DeleteOutcome::Deleted
    );
    assert_eq!(
        signing.delete_key_pair(&req).await.unwrap().delete_status,
        DeleteOutcome::NotFound
    );
    assert!(!signing.does_key_pair_exist(&req).await.unwrap().is_existing);

    let err = signing
        .sign(&SignRequest::new("com.example.device", b64(b"x")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
}

#[tokio::test]
async fn generate_refuses_to_overwrite() {
    let signing = SecureSigning::new(CountingStore::new(), SigningConfig::default());
    let req = KeyRequest::new("k");

    let original = signing.generate_key_pair(&req).await.unwrap();
    let err = signing.generate_key_pair(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyGenerationError);

    assert_eq!(signing.get_key_pair(&req).await.unwrap(), original);
}

#[tokio::test]
async fn regenerated_key_differs() {
    let signing = SecureSigning::new(CountingStore::new(), SigningConfig::default());
    let req = KeyRequest::new("k");

    let first = signing.generate_key_pair(&req).await.unwrap();
    signing.delete_key_pair(&req).await.unwrap();
    let second = signing.generate_key_pair(&req).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn invalid_input_never_reaches_store() {
    let store = CountingStore::new();
    let signing = SecureSigning::new(store.clone(), SigningConfig::default());

    let err = signing
        .sign(&SignRequest::new("k", "this is not base64!"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    let err = signing
        .sign(&SignRequest {
            prefixed_key: Some("k".into()),
            data: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    for req in [KeyRequest::default(), KeyRequest::new("")] {
        assert_eq!(
            signing.does_key_pair_exist(&req).await.unwrap_err().kind(),
            ErrorKind::MissingKey
        );
        assert_eq!(
            signing.create_key_pair_if_does_not_exist(&req).await.unwrap_err().kind(),
            ErrorKind::MissingKey
        );
        assert_eq!(
            signing.delete_key_pair(&req).await.unwrap_err().kind(),
            ErrorKind::MissingKey
        );
    }

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn empty_message_is_signed() {
    let signing = SecureSigning::new(CountingStore::new(), SigningConfig::default());
    let key = signing
        .create_key_pair_if_does_not_exist(&KeyRequest::new("k"))
        .await
        .unwrap();

    let sig = signing.sign(&SignRequest::new("k", "")).await.unwrap();
    assert!(verifies(&key.public_key, b"", &sig.signature));
}

#[tokio::test]
async fn signatures_are_deterministic_der() {
    let signing = SecureSigning::new(CountingStore::new(), SigningConfig::default());
    signing
        .create_key_pair_if_does_not_exist(&KeyRequest::new("k"))
        .await
        .unwrap();

    let a = signing.sign(&SignRequest::new("k", b64(b"m"))).await.unwrap();
    let b = signing.sign(&SignRequest::new("k", b64(b"m"))).await.unwrap();
    assert_eq!(a, b);

    let der = STANDARD.decode(&a.signature).unwrap();
    assert_eq!(der[0], 0x30);
    assert!(der.len() <= 72);
}

#[tokio::test]
async fn legacy_ed25519_key_cannot_sign() {
    let store = Arc::new(MemoryKeyStore::new());
    let label = secure_signing_core::KeyLabel::new("legacy").unwrap();
    store.import_ed25519(&label, &[3u8; 32]).unwrap();

    let signing = SecureSigning::new(store, SigningConfig::default());
    assert!(
        signing
            .does_key_pair_exist(&KeyRequest::new("legacy"))
            .await
            .unwrap()
            .is_existing
    );

    let err = signing
        .sign(&SignRequest::new("legacy", b64(b"x")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SigningError);
}

fn protected_config() -> SigningConfig {
    SigningConfig::default().default_tier(PermissionTier::authentication_required())
}

#[tokio::test]
async fn protected_key_requires_lock_screen() {
    let signing = SecureSigning::new(CountingStore::new(), protected_config());
    let err = signing
        .create_key_pair_if_does_not_exist(&KeyRequest::new("k"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureLockScreenDisabled);

    let keys = KeyManager::new(CountingStore::new())
        .with_presence(Arc::new(FixedPresence::without_lock_screen()));
    let signing = SecureSigning::with_key_manager(keys, protected_config());
    let err = signing.generate_key_pair(&KeyRequest::new("k")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecureLockScreenDisabled);
    assert!(!signing.does_key_pair_exist(&KeyRequest::new("k")).await.unwrap().is_existing);
}

#[tokio::test]
async fn protected_key_confirmation_window() {
    let presence = Arc::new(FixedPresence::approving());
    let keys = KeyManager::new(CountingStore::new()).with_presence(presence.clone());
    let signing = SecureSigning::with_key_manager(keys, protected_config());

    let key = signing.generate_key_pair(&KeyRequest::new("k")).await.unwrap();
    for msg in [b"a".as_slice(), b"b", b"c"] {
        let sig = signing.sign(&SignRequest::new("k", b64(msg))).await.unwrap();
        assert!(verifies(&key.public_key, msg, &sig.signature));
    }
    assert_eq!(presence.prompts(), 1);
}

#[tokio::test]
async fn protected_key_declined() {
    let keys = KeyManager::new(CountingStore::new())
        .with_presence(Arc::new(FixedPresence::declining()));
    let signing = SecureSigning::with_key_manager(keys, protected_config());

    signing.generate_key_pair(&KeyRequest::new("k")).await.unwrap();
    let err = signing.sign(&SignRequest::new("k", b64(b"x"))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserNotAuthenticated);
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = SigningConfig::new(BackendChoice::EncryptedFile).store(
        StoreConfig::new(BackendChoice::EncryptedFile)
            .directory(dir.path())
            .store_secret("correct horse"),
    );

    let created = {
        let signing = SecureSigning::open(config.clone()).unwrap();
        signing
            .create_key_pair_if_does_not_exist(&KeyRequest::new("device"))
            .await
            .unwrap()
    };

    let signing = SecureSigning::open(config).unwrap();
    let fetched = signing.get_key_pair(&KeyRequest::new("device")).await.unwrap();
    assert_eq!(fetched, created);

    let sig = signing
        .sign(&SignRequest::new("device", b64(b"persisted")))
        .await
        .unwrap();
    assert!(verifies(&created.public_key, b"persisted", &sig.signature));

    let labels = signing.list_key_pairs().await.unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].as_str(), "device");
}

#[tokio::test]
async fn file_store_wrong_secret_sees_no_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = |secret: &str| {
        SigningConfig::default().store(
            StoreConfig::new(BackendChoice::EncryptedFile)
                .directory(dir.path())
                .store_secret(secret),
        )
    };

    SecureSigning::open(store("one"))
        .unwrap()
        .generate_key_pair(&KeyRequest::new("k"))
        .await
        .unwrap();

    let other = SecureSigning::open(store("two")).unwrap();
    let err = other.get_key_pair(&KeyRequest::new("k")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    assert!(other.list_key_pairs().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_store_tampered_record_is_keystore_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = SigningConfig::default().store(
        StoreConfig::new(BackendChoice::EncryptedFile)
            .directory(dir.path())
            .store_secret("s"),
    );
    let signing = SecureSigning::open(config).unwrap();
    signing.generate_key_pair(&KeyRequest::new("k")).await.unwrap();

    let record = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|ext| ext == "key"))
        .unwrap();
    let mut bytes = std::fs::read(&record).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&record, bytes).unwrap();

    let err = signing.get_key_pair(&KeyRequest::new("k")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeystoreError);

    let err = signing.sign(&SignRequest::new("k", b64(b"x"))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeystoreError);
}
