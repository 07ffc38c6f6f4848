//! Property-based tests for signing and boundary decoding.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use proptest::prelude::*;

use secure_signing_core::{
    verify, ErrorKind, KeyRequest, SecureSigning, SignRequest, SigningConfig,
};
use secure_signing_keystore::MemoryKeyStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn service() -> SecureSigning {
    SecureSigning::new(Arc::new(MemoryKeyStore::new()), SigningConfig::default())
}

/// Strings containing at least one byte outside the base64 alphabet.
fn non_base64() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9+/]{0,16}", "[!#$%&*()\\-_ .,;:?]", "[A-Za-z0-9+/]{0,16}")
        .prop_map(|(a, bad, b)| format!("{a}{bad}{b}"))
}

proptest! {
    // Key generation dominates; keep the case count modest
    #![proptest_config(ProptestConfig {
        cases: 32,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    /// Every signature verifies under the returned public key, and only for
    /// the signed message.
    #[test]
    fn signature_verifies_for_signed_message(
        message in prop::collection::vec(any::<u8>(), 0..512),
        other in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let rt = runtime();
        let signing = service();

        let (pk, sig) = rt.block_on(async {
            let key = signing
                .create_key_pair_if_does_not_exist(&KeyRequest::new("prop"))
                .await
                .unwrap();
            let sig = signing
                .sign(&SignRequest::new("prop", STANDARD.encode(&message)))
                .await
                .unwrap();
            (key.public_key, sig.signature)
        });

        let pk = STANDARD.decode(pk).unwrap();
        let der = STANDARD.decode(sig).unwrap();
        prop_assert_eq!(pk.len(), 65);
        prop_assert!(verify(&pk, &message, &der).unwrap());
        if other != message {
            prop_assert!(!verify(&pk, &other, &der).unwrap());
        }
    }

    /// A signature never verifies under another label's public key.
    #[test]
    fn signature_bound_to_signing_key(
        message in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let rt = runtime();
        let signing = service();

        let (other_pk, sig) = rt.block_on(async {
            signing
                .create_key_pair_if_does_not_exist(&KeyRequest::new("signer"))
                .await
                .unwrap();
            let other = signing
                .create_key_pair_if_does_not_exist(&KeyRequest::new("other"))
                .await
                .unwrap();
            let sig = signing
                .sign(&SignRequest::new("signer", STANDARD.encode(&message)))
                .await
                .unwrap();
            (other.public_key, sig.signature)
        });

        let other_pk = STANDARD.decode(other_pk).unwrap();
        let der = STANDARD.decode(sig).unwrap();
        prop_assert!(!verify(&other_pk, &message, &der).unwrap());
    }

    /// Undecodable payloads fail with invalidData and create nothing.
    #[test]
    fn undecodable_payload_is_invalid_data(data in non_base64()) {
        let rt = runtime();
        let signing = service();

        let err = rt.block_on(signing.sign(&SignRequest::new("prop", data))).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidData);

        let exists = rt
            .block_on(signing.does_key_pair_exist(&KeyRequest::new("prop")))
            .unwrap();
        prop_assert!(!exists.is_existing);
    }

    /// Any non-empty label addresses exactly one key.
    #[test]
    fn any_label_addresses_one_key(label in "\\PC{1,64}") {
        let rt = runtime();
        let signing = service();
        let req = KeyRequest::new(label.clone());

        let (created, fetched, listed) = rt.block_on(async {
            let created = signing.create_key_pair_if_does_not_exist(&req).await.unwrap();
            let fetched = signing.get_key_pair(&req).await.unwrap();
            let listed = signing.list_key_pairs().await.unwrap();
            (created, fetched, listed)
        });

        prop_assert_eq!(created, fetched);
        prop_assert_eq!(listed.len(), 1);
        prop_assert_eq!(listed[0].as_str(), label.as_str());
    }
}
