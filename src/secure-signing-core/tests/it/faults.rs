//! Backend faults: swallowed at the facade for query/delete, surfaced
//! everywhere else.

use std::sync::Arc;

use secure_signing_core::{
    DeleteOutcome, ErrorKind, KeyGenConfig, KeyLabel, KeyManager, KeyRequest, SecureSigning,
    SignRequest, SigningConfig,
};

use crate::support::FailingStore;

fn service() -> SecureSigning {
    SecureSigning::new(Arc::new(FailingStore), SigningConfig::default())
}

#[tokio::test]
async fn exists_reports_false_on_fault() {
    let res = service()
        .does_key_pair_exist(&KeyRequest::new("k"))
        .await
        .unwrap();
    assert!(!res.is_existing);
}

#[tokio::test]
async fn delete_reports_not_found_on_fault() {
    let res = service().delete_key_pair(&KeyRequest::new("k")).await.unwrap();
    assert_eq!(res.delete_status, DeleteOutcome::NotFound);
}

#[tokio::test]
async fn missing_label_still_rejected_on_faulty_store() {
    let err = service()
        .does_key_pair_exist(&KeyRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
}

#[tokio::test]
async fn other_operations_surface_faults() {
    let signing = service();
    let req = KeyRequest::new("k");

    assert_eq!(
        signing.generate_key_pair(&req).await.unwrap_err().kind(),
        ErrorKind::KeyGenerationError
    );
    assert_eq!(
        signing.create_key_pair_if_does_not_exist(&req).await.unwrap_err().kind(),
        ErrorKind::KeystoreError
    );
    assert_eq!(
        signing.get_key_pair(&req).await.unwrap_err().kind(),
        ErrorKind::KeystoreError
    );
    assert_eq!(
        signing
            .sign(&SignRequest::new("k", "AA=="))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::KeystoreError
    );
    assert_eq!(
        signing.list_key_pairs().await.unwrap_err().kind(),
        ErrorKind::KeystoreError
    );
}

#[tokio::test]
async fn key_manager_surfaces_query_and_delete_faults() {
    let keys = KeyManager::new(Arc::new(FailingStore));
    let label = KeyLabel::new("k").unwrap();

    assert_eq!(keys.exists(&label).await.unwrap_err().kind(), ErrorKind::KeystoreError);
    assert_eq!(keys.delete(&label).await.unwrap_err().kind(), ErrorKind::KeystoreError);
    assert_eq!(
        keys.generate(&label, &KeyGenConfig::new()).await.unwrap_err().kind(),
        ErrorKind::KeyGenerationError
    );
}
