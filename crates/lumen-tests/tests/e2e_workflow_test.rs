//! End-to-end login and signing workflow
//!
//! Drives the whole path a wallet takes: ephemeral identity, OAuth round
//! trip, proof acquisition, derivation, session persistence, and finally a
//! signed transaction that a verifying fake ledger accepts.

use lumen_auth::{OAuthConfig, RedirectController};
use lumen_core::{
    derive_address, DecodedJwt, EphemeralIdentity, Error, IdentityProof, Pin, UserIdentity,
};
use lumen_session::{load_session, save_session, MemorySessionStore};
use lumen_signer::{sign_and_execute, TransactionKind, UnsignedTransaction};
use lumen_tests::{
    fixture_oracle_response, fixture_token, logged_in_session, FakeLedger, TEST_AUDIENCE,
    TEST_ISSUER,
};

use lumen_core::Address;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[tokio::test]
async fn test_full_login_and_signing_workflow() {
    let ledger = FakeLedger::new(10);
    let pin = "482913";

    // ==========================================
    // STEP 1: Begin a login attempt
    // ==========================================
    let (identity, nonce) = EphemeralIdentity::begin(&ledger).await.unwrap();
    assert_eq!(identity.max_epoch, 12);

    // ==========================================
    // STEP 2: OAuth round trip via the hosted UI
    // ==========================================
    let config = OAuthConfig::default();
    let url = config.authorize_url(&nonce);
    assert!(url.contains(&format!("nonce={}", nonce)));

    // The provider redirects back with tokens in the fragment
    let token = fixture_token(TEST_ISSUER, "user-7", TEST_AUDIENCE, &nonce);
    let fragment = format!("#id_token={}&access_token=at-1&token_type=Bearer", token);
    let mut controller = RedirectController::new();
    let outcome = controller.extract_tokens(Some(&fragment), None);
    let tokens = outcome.tokens.unwrap();
    assert_eq!(tokens.id_token, token);

    // The issued token carries the nonce we asked for
    let jwt = DecodedJwt::parse(&tokens.id_token).unwrap();
    assert_eq!(jwt.claims.nonce.as_deref(), Some(nonce.as_str()));

    // ==========================================
    // STEP 3: Proof acquisition (oracle response normalization)
    // ==========================================
    let proof = IdentityProof::from_oracle_json(&fixture_oracle_response(), &jwt).unwrap();
    assert_eq!(proof.iss_base64_details.value, TEST_ISSUER);

    // ==========================================
    // STEP 4: Derivation and session persistence
    // ==========================================
    let pin_typed = Pin::new(pin).unwrap();
    let address = derive_address(&jwt.claims, &pin_typed).unwrap();
    let user = UserIdentity::from_jwt(&jwt, &pin_typed, "cognito").unwrap();
    assert_eq!(user.address, address);

    let store = MemorySessionStore::new();
    let session = lumen_core::Session {
        ephemeral: Some(identity.to_stored(&nonce)),
        proof: Some(proof),
        id_token: Some(tokens.id_token),
    };
    save_session(&store, &session);
    let restored = load_session(&store);
    assert!(restored.is_complete());

    // ==========================================
    // STEP 5: Sign and execute a transfer
    // ==========================================
    let tx = UnsignedTransaction::new(TransactionKind::TransferToken {
        recipient: Address::new([3u8; 32]),
        amount: 1_000,
    });
    let receipt = sign_and_execute(&ledger, tx, &restored, pin, address)
        .await
        .unwrap();
    assert!(receipt.digest.as_str().starts_with("digest-"));
    assert_eq!(ledger.execute_count(), 1);
}

#[tokio::test]
async fn test_same_pin_same_wallet_on_any_device() {
    // Two independent logins (different ephemeral keys, different nonces)
    // with the same identity and PIN land on the same address
    let mut rng_a = ChaCha20Rng::seed_from_u64(1);
    let mut rng_b = ChaCha20Rng::seed_from_u64(2);
    let (_, address_a) = logged_in_session("user-7", "482913", 12, &mut rng_a).unwrap();
    let (_, address_b) = logged_in_session("user-7", "482913", 12, &mut rng_b).unwrap();
    assert_eq!(address_a, address_b);

    // A different PIN is a different wallet
    let mut rng_c = ChaCha20Rng::seed_from_u64(3);
    let (_, address_c) = logged_in_session("user-7", "482914", 12, &mut rng_c).unwrap();
    assert_ne!(address_a, address_c);

    // And a different subject is a different wallet too
    let mut rng_d = ChaCha20Rng::seed_from_u64(4);
    let (_, address_d) = logged_in_session("user-8", "482913", 12, &mut rng_d).unwrap();
    assert_ne!(address_a, address_d);
}

#[tokio::test]
async fn test_signing_preconditions_never_reach_the_ledger() {
    let ledger = FakeLedger::new(10);
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let (session, address) = logged_in_session("user-1", "111111", 12, &mut rng).unwrap();

    let tx = || {
        UnsignedTransaction::new(TransactionKind::TransferToken {
            recipient: Address::new([3u8; 32]),
            amount: 1,
        })
    };

    let err = sign_and_execute(&ledger, tx(), &session, "", address)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingPin));

    let mut no_key = session.clone();
    no_key.ephemeral = None;
    let err = sign_and_execute(&ledger, tx(), &no_key, "111111", address)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingEphemeralKey));

    let mut no_proof = session.clone();
    no_proof.proof = None;
    let err = sign_and_execute(&ledger, tx(), &no_proof, "111111", address)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingProof));

    assert_eq!(ledger.execute_count(), 0);
}

#[tokio::test]
async fn test_expired_ephemeral_key_is_rejected() {
    // Key minted for max epoch 12, ledger already at 20
    let ledger = FakeLedger::new(20);
    let mut rng = ChaCha20Rng::seed_from_u64(6);
    let (session, address) = logged_in_session("user-1", "111111", 12, &mut rng).unwrap();

    let tx = UnsignedTransaction::new(TransactionKind::TransferToken {
        recipient: Address::new([3u8; 32]),
        amount: 1,
    });
    let err = sign_and_execute(&ledger, tx, &session, "111111", address)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LedgerRejected(_)));
}
