#![allow(missing_docs)]

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blake2::{digest::consts::U32, Blake2b, Digest};
use common::{
    id_token, id_token_from, zklogin, FakeBuilder, FakeChain, CLIENT_ID, ISSUER, SUBJECT,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use zklogin_core::{
    address::{gen_address_seed, jwt_to_address, Salt},
    keys::{compute_nonce, extended_public_key, EphemeralKeyPair},
    AccountRecord, OpenIdProvider, RedirectOutcome, SessionStore, ZkLogin, ZkLoginError,
};

async fn salt_mock(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/get_salt")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"salt": "12345"}"#)
        .expect(hits)
        .create_async()
        .await
}

async fn prover_mock(server: &mut ServerGuard, body: &Value) -> Mock {
    server
        .mock("POST", "/v1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// Runs a full login and returns the stored account.
async fn login(zklogin: &ZkLogin) -> AccountRecord {
    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token(Some(authorization.nonce.as_str()));
    match zklogin
        .handle_redirect(&format!("https://app.example/callback#id_token={token}"))
        .await
        .unwrap()
    {
        RedirectOutcome::AccountAdded(record) => record,
        other => panic!("expected an account, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_login_persists_setup() {
    let server = Server::new_async().await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    assert_eq!(authorization.max_epoch, 102);
    assert!(zklogin.accounts().unwrap().is_empty());

    let setup = zklogin.pending_setup().unwrap().unwrap();
    assert_eq!(setup.max_epoch, 102);
    assert_eq!(setup.provider, OpenIdProvider::Google);

    let keypair = EphemeralKeyPair::from_secret(&setup.ephemeral_private_key).unwrap();
    let nonce = compute_nonce(&keypair.public_key(), setup.max_epoch, setup.randomness).unwrap();
    assert_eq!(nonce, authorization.nonce);

    let url = url::Url::parse(&authorization.url).unwrap();
    assert_eq!(url.host_str(), Some("accounts.google.com"));
    let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(params.contains(&("nonce".to_string(), nonce)));
    assert!(params.contains(&("client_id".to_string(), CLIENT_ID.to_string())));
    assert!(params.contains(&("response_type".to_string(), "id_token".to_string())));
}

#[tokio::test]
async fn test_start_login_replaces_previous_attempt() {
    let server = Server::new_async().await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());

    let first = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    chain.set_epoch(Some(200));
    let second = zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    assert_ne!(first.nonce, second.nonce);
    assert_eq!(zklogin.pending_setup().unwrap().unwrap().max_epoch, 202);
}

#[tokio::test]
async fn test_start_login_epoch_failure_persists_nothing() {
    let server = Server::new_async().await;
    let chain = FakeChain::new(100);
    chain.set_epoch(None);
    let (zklogin, _) = zklogin(&server.url(), chain);

    let result = zklogin.start_login(OpenIdProvider::Google).await;

    assert!(matches!(result, Err(ZkLoginError::NetworkFailure { .. })));
    assert_eq!(zklogin.pending_setup().unwrap(), None);
}

#[tokio::test]
async fn test_start_login_requires_client_id() {
    let server = Server::new_async().await;
    let mut config = common::config(&server.url());
    config.client_ids.clear();
    let zklogin = ZkLogin::new(
        config,
        std::sync::Arc::new(zklogin_core::InMemorySessionStore::new()),
        FakeChain::new(100),
        std::sync::Arc::new(FakeBuilder),
    )
    .unwrap();

    let result = zklogin.start_login(OpenIdProvider::Google).await;

    assert!(matches!(result, Err(ZkLoginError::InvalidInput { .. })));
    assert_eq!(zklogin.pending_setup().unwrap(), None);
}

#[tokio::test]
async fn test_redirect_adds_account() {
    let mut server = Server::new_async().await;
    let salt = salt_mock(&mut server, 1).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let setup = zklogin.pending_setup().unwrap().unwrap();
    let public_key = EphemeralKeyPair::from_secret(&setup.ephemeral_private_key)
        .unwrap()
        .public_key();

    let prover = server
        .mock("POST", "/v1")
        .match_body(Matcher::PartialJson(json!({
            "maxEpoch": 102,
            "jwtRandomness": setup.randomness.to_string(),
            "extendedEphemeralPublicKey": STANDARD.encode(extended_public_key(&public_key)),
            "salt": "12345",
            "keyClaimName": "sub",
        })))
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .create_async()
        .await;

    let token = id_token(Some(authorization.nonce.as_str()));
    let outcome = zklogin
        .handle_redirect(&format!("#id_token={token}&authuser=0"))
        .await
        .unwrap();

    salt.assert_async().await;
    prover.assert_async().await;

    let RedirectOutcome::AccountAdded(record) = outcome else {
        panic!("expected an account, got {outcome:?}");
    };
    let salt = Salt::from_decimal("12345").unwrap();
    assert_eq!(record.address, jwt_to_address(&token, &salt).unwrap());
    assert_eq!(record.max_epoch, 102);
    assert_eq!(record.salt, salt);
    assert_eq!(record.sub, SUBJECT);
    assert_eq!(record.aud, CLIENT_ID);
    assert_eq!(record.iss, ISSUER);
    assert_eq!(record.zk_proofs.as_json(), &json!({ "ok": true }));
    assert_eq!(record.ephemeral_private_key, setup.ephemeral_private_key);

    assert_eq!(zklogin.accounts().unwrap(), vec![record]);
    assert_eq!(zklogin.pending_setup().unwrap(), None);
}

#[tokio::test]
async fn test_redirect_is_single_use() {
    let mut server = Server::new_async().await;
    let salt = salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let callback = format!("#id_token={}", id_token(Some(authorization.nonce.as_str())));

    let first = zklogin.handle_redirect(&callback).await.unwrap();
    let second = zklogin.handle_redirect(&callback).await.unwrap();

    assert!(matches!(first, RedirectOutcome::AccountAdded(_)));
    assert_eq!(second, RedirectOutcome::StaleOrMissingSetup);
    assert_eq!(zklogin.accounts().unwrap().len(), 1);
    salt.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_redirects_complete_once() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let callback = format!("?id_token={}", id_token(Some(authorization.nonce.as_str())));

    let (a, b) = tokio::join!(
        zklogin.handle_redirect(&callback),
        zklogin.handle_redirect(&callback)
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, RedirectOutcome::AccountAdded(_)))
            .count(),
        1
    );
    assert_eq!(zklogin.accounts().unwrap().len(), 1);
}

#[tokio::test]
async fn test_redirect_without_setup_is_ignored() {
    let mut server = Server::new_async().await;
    let salt = salt_mock(&mut server, 0).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let outcome = zklogin
        .handle_redirect(&format!("id_token={}", id_token(None)))
        .await
        .unwrap();

    assert_eq!(outcome, RedirectOutcome::StaleOrMissingSetup);
    assert!(zklogin.accounts().unwrap().is_empty());
    salt.assert_async().await;
}

#[tokio::test]
async fn test_navigation_without_token_is_not_a_callback() {
    let server = Server::new_async().await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));
    zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    let outcome = zklogin
        .handle_redirect("https://app.example/callback#state=abc")
        .await
        .unwrap();

    assert_eq!(outcome, RedirectOutcome::NotAnAuthCallback);
    assert!(zklogin.pending_setup().unwrap().is_some());
}

#[tokio::test]
async fn test_malformed_token_keeps_setup() {
    let server = Server::new_async().await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));
    zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    let result = zklogin.handle_redirect("#id_token=not-a-token").await;

    assert!(matches!(result, Err(ZkLoginError::MalformedToken { .. })));
    assert!(zklogin.pending_setup().unwrap().is_some());
}

#[tokio::test]
async fn test_nonce_mismatch_is_rejected() {
    let mut server = Server::new_async().await;
    let salt = salt_mock(&mut server, 0).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));
    zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    let result = zklogin
        .handle_redirect(&format!("#id_token={}", id_token(Some("another-attempt"))))
        .await;

    assert!(matches!(result, Err(ZkLoginError::MalformedToken { .. })));
    assert!(zklogin.accounts().unwrap().is_empty());
    salt.assert_async().await;
}

#[tokio::test]
async fn test_foreign_issuer_is_rejected() {
    let mut server = Server::new_async().await;
    let salt = salt_mock(&mut server, 0).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token_from("https://evil.example", Some(authorization.nonce.as_str()));
    let result = zklogin.handle_redirect(&format!("#id_token={token}")).await;

    assert!(matches!(result, Err(ZkLoginError::MalformedToken { .. })));
    assert!(zklogin.accounts().unwrap().is_empty());
    salt.assert_async().await;
}

#[tokio::test]
async fn test_issuer_without_scheme_is_accepted() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token_from("accounts.google.com", Some(authorization.nonce.as_str()));
    let outcome = zklogin
        .handle_redirect(&format!("#id_token={token}"))
        .await
        .unwrap();

    let RedirectOutcome::AccountAdded(record) = outcome else {
        panic!("expected an account, got {outcome:?}");
    };
    let canonical = id_token(Some(authorization.nonce.as_str()));
    let salt = Salt::from_decimal("12345").unwrap();
    assert_eq!(record.address, jwt_to_address(&canonical, &salt).unwrap());
}

#[tokio::test]
async fn test_salt_failure_commits_nothing() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/get_salt")
        .with_status(500)
        .with_body("salt service unavailable")
        .create_async()
        .await;
    let prover = server
        .mock("POST", "/v1")
        .expect(0)
        .create_async()
        .await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token(Some(authorization.nonce.as_str()));
    let result = zklogin.handle_redirect(&format!("#id_token={token}")).await;

    assert!(matches!(
        result,
        Err(ZkLoginError::NetworkFailure {
            status: Some(500),
            ..
        })
    ));
    assert!(zklogin.accounts().unwrap().is_empty());
    assert_eq!(zklogin.pending_setup().unwrap(), None);
    prover.assert_async().await;
}

#[tokio::test]
async fn test_prover_failure_commits_nothing() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    server
        .mock("POST", "/v1")
        .with_status(500)
        .with_body("prover overloaded")
        .create_async()
        .await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token(Some(authorization.nonce.as_str()));
    let result = zklogin.handle_redirect(&format!("#id_token={token}")).await;

    assert!(matches!(
        result,
        Err(ZkLoginError::NetworkFailure {
            status: Some(500),
            ..
        })
    ));
    assert!(zklogin.accounts().unwrap().is_empty());
}

#[tokio::test]
async fn test_prover_rejection_commits_nothing() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "success": false, "message": "invalid jwt" })).await;
    let (zklogin, _) = zklogin(&server.url(), FakeChain::new(100));

    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();
    let token = id_token(Some(authorization.nonce.as_str()));
    let result = zklogin.handle_redirect(&format!("#id_token={token}")).await;

    assert!(matches!(
        result,
        Err(ZkLoginError::ProofServiceRejection { .. })
    ));
    assert!(zklogin.accounts().unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let (zklogin, session) = zklogin(&server.url(), FakeChain::new(100));

    login(&zklogin).await;
    let authorization = zklogin.start_login(OpenIdProvider::Google).await.unwrap();

    zklogin.reset().unwrap();

    assert!(zklogin.accounts().unwrap().is_empty());
    assert_eq!(zklogin.pending_setup().unwrap(), None);
    assert_eq!(session.read("zklogin.accounts").unwrap(), None);
    assert_eq!(session.read("zklogin.setup").unwrap(), None);

    let outcome = zklogin
        .handle_redirect(&format!("#id_token={}", id_token(Some(authorization.nonce.as_str()))))
        .await
        .unwrap();
    assert_eq!(outcome, RedirectOutcome::StaleOrMissingSetup);
}

#[tokio::test]
async fn test_sign_transaction_submits_zklogin_signature() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "proofPoints": { "a": ["1"] } })).await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());
    let account = login(&zklogin).await;

    chain.set_epoch(Some(101));
    let digest = zklogin
        .sign_transaction(&account, b"pending")
        .await
        .unwrap();

    assert_eq!(digest, "digest-1");
    let submissions = chain.submissions();
    assert_eq!(submissions.len(), 1);
    let (tx_bytes, signature) = &submissions[0];
    assert_eq!(tx_bytes, &FakeBuilder::built_bytes(b"pending", &account.address));

    let signature = STANDARD.decode(signature).unwrap();
    assert_eq!(signature[0], 0x05);
    let payload: Value = serde_json::from_slice(&signature[1..]).unwrap();
    let seed = gen_address_seed(&account.salt, "sub", &account.sub, &account.aud).unwrap();
    assert_eq!(payload["inputs"]["addressSeed"], seed.to_string());
    assert_eq!(payload["inputs"]["proofPoints"], json!({ "a": ["1"] }));
    assert_eq!(payload["maxEpoch"], 102);

    let user_signature = STANDARD
        .decode(payload["userSignature"].as_str().unwrap())
        .unwrap();
    assert_eq!(user_signature.len(), 1 + 64 + 32);
    assert_eq!(user_signature[0], 0x00);
    let public_key_bytes: [u8; 32] = user_signature[65..].try_into().unwrap();
    let public_key = VerifyingKey::from_bytes(&public_key_bytes).unwrap();
    assert_eq!(
        public_key,
        EphemeralKeyPair::from_secret(&account.ephemeral_private_key)
            .unwrap()
            .public_key()
    );
    let digest: [u8; 32] = Blake2b::<U32>::new()
        .chain_update([0u8; 3])
        .chain_update(tx_bytes)
        .finalize()
        .into();
    let signature = Signature::from_slice(&user_signature[1..65]).unwrap();
    public_key.verify(&digest, &signature).unwrap();
}

#[tokio::test]
async fn test_sign_with_mismatched_seed_submits_nothing() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());
    let account = login(&zklogin).await;

    let mut tampered = account.clone();
    tampered.sub = "someone-else".to_string();
    let result = zklogin.sign_transaction(&tampered, b"pending").await;

    assert!(matches!(result, Err(ZkLoginError::SigningFailure { .. })));
    assert!(chain.submissions().is_empty());
    assert_eq!(zklogin.accounts().unwrap(), vec![account]);
}

#[tokio::test]
async fn test_sign_with_foreign_proof_seed_submits_nothing() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "addressSeed": "1" })).await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());
    let account = login(&zklogin).await;

    let result = zklogin.sign_transaction(&account, b"pending").await;

    assert!(matches!(result, Err(ZkLoginError::SigningFailure { .. })));
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_sign_with_expired_key_submits_nothing() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());
    let account = login(&zklogin).await;

    chain.set_epoch(Some(103));
    let result = zklogin.sign_transaction(&account, b"pending").await;

    match result {
        Err(ZkLoginError::SigningFailure { reason }) => assert!(reason.contains("expired")),
        other => panic!("expected SigningFailure, got {other:?}"),
    }
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_sign_errors_become_signing_failures_except_timeouts() {
    let mut server = Server::new_async().await;
    salt_mock(&mut server, 1).await;
    prover_mock(&mut server, &json!({ "ok": true })).await;
    let chain = FakeChain::new(100);
    let (zklogin, _) = zklogin(&server.url(), chain.clone());
    let account = login(&zklogin).await;

    chain.set_epoch(None);
    let result = zklogin.sign_transaction(&account, b"pending").await;
    assert!(matches!(result, Err(ZkLoginError::SigningFailure { .. })));

    chain.set_epoch(Some(100));
    chain.time_out_submissions();
    let result = zklogin.sign_transaction(&account, b"pending").await;
    assert!(matches!(result, Err(ZkLoginError::Timeout { .. })));
}
