// web-server/tests/api_flow.rs
use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
use actix_web::{web, App};
use alloy_primitives::U256;
use serde_json::{json, Value};
use std::sync::Arc;

use web_server::api;
use web_server::gate::SESSION_COOKIE_NAME;
use web_server::state::AppState;
use web_server::store::MemoryStore;
use web_server::testing::{
    address_of, payment_receipt, sign_personal_message, test_config, test_signing_key, FakeChainClient,
    TEST_PAYMENT_CONTRACT,
};

fn app_state(chain: Arc<FakeChainClient>) -> web::Data<AppState> {
    let state = AppState::build(test_config(), Arc::new(MemoryStore::new()), chain)
        .expect("test config is valid");
    web::Data::new(state)
}

macro_rules! test_app {
    ($state:expr) => {
        init_service(App::new().app_data($state.clone()).configure(api::configure)).await
    };
}

/// Run the nonce/sign/verify exchange and return the session cookie
macro_rules! sign_in {
    ($app:expr, $key:expr) => {{
        let address = address_of(&$key);
        let resp = call_service(
            &$app,
            TestRequest::post()
                .uri("/api/auth/nonce")
                .set_json(json!({ "address": address }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        let signature = sign_personal_message(&$key, body["message"].as_str().unwrap());

        let resp = call_service(
            &$app,
            TestRequest::post()
                .uri("/api/auth/verify")
                .set_json(json!({ "address": address, "signature": signature }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie: Cookie<'static> = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE_NAME)
            .map(|c| c.into_owned())
            .expect("verify sets the session cookie");
        cookie
    }};
}

fn tx_hash(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

#[actix_web::test]
async fn test_sign_in_pay_and_enter_app() {
    let chain = Arc::new(FakeChainClient::new());
    let state = app_state(chain.clone());
    let app = test_app!(state);
    let key = test_signing_key(21);
    let address = address_of(&key);

    let cookie = sign_in!(app, key);
    assert_eq!(cookie.http_only(), Some(true));

    // signed in but unpaid
    let resp = call_service(&app, TestRequest::get().uri("/api/app").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "PaymentRequired");

    let resp = call_service(&app, TestRequest::get().uri("/api/auth/status").cookie(cookie.clone()).to_request()).await;
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["isLoggedIn"], false);
    assert_eq!(body["user"]["address"], address.as_str());

    let resp = call_service(&app, TestRequest::post().uri("/api/payment/initiate").cookie(cookie.clone()).to_request()).await;
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["paymentContractAddress"], TEST_PAYMENT_CONTRACT);
    assert_eq!(body["fixedAmount"], "1000");

    let tx = tx_hash("aa");
    chain.insert_receipt(payment_receipt(&tx, TEST_PAYMENT_CONTRACT, Some(&address), U256::from(1_000u64)));
    let resp = call_service(
        &app,
        TestRequest::post()
            .uri("/api/payment/confirm")
            .cookie(cookie.clone())
            .set_json(json!({ "txHash": tx }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "CONFIRMED");
    assert_eq!(body["payment"]["amount"], "1000");

    let resp = call_service(&app, TestRequest::get().uri("/api/app").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["hasAccess"], true);
    assert_eq!(body["payment"]["txHash"], tx.as_str());

    let resp = call_service(&app, TestRequest::get().uri("/api/payment/status").cookie(cookie.clone()).to_request()).await;
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["hasPaid"], true);

    let resp = call_service(&app, TestRequest::get().uri("/api/payment/check").cookie(cookie.clone()).to_request()).await;
    let check: Value = read_body_json(resp).await;
    assert_eq!(check, body);

    // logout clears the session but not the access flag
    let resp = call_service(&app, TestRequest::post().uri("/api/auth/logout").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.into_owned())
        .expect("logout clears the cookie");
    assert_eq!(removal.value(), "");

    let resp = call_service(&app, TestRequest::get().uri("/api/app").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let cookie = sign_in!(app, key);
    let resp = call_service(&app, TestRequest::get().uri("/api/app").cookie(cookie).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_replayed_signature_rejected() {
    let state = app_state(Arc::new(FakeChainClient::new()));
    let app = test_app!(state);
    let key = test_signing_key(22);
    let address = address_of(&key);

    let resp = call_service(
        &app,
        TestRequest::post()
            .uri("/api/auth/nonce")
            .set_json(json!({ "address": address }))
            .to_request(),
    )
    .await;
    let body: Value = read_body_json(resp).await;
    let signature = sign_personal_message(&key, body["message"].as_str().unwrap());
    let verify = json!({ "address": address, "signature": signature });

    let first = call_service(&app, TestRequest::post().uri("/api/auth/verify").set_json(&verify).to_request()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = call_service(&app, TestRequest::post().uri("/api/auth/verify").set_json(&verify).to_request()).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(replay).await;
    assert_eq!(body["kind"], "NoNonce");
}

#[actix_web::test]
async fn test_unauthenticated_requests() {
    let state = app_state(Arc::new(FakeChainClient::new()));
    let app = test_app!(state);

    for uri in ["/api/auth/me", "/api/app", "/api/payment/status", "/api/staking/status"] {
        let resp = call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["kind"], "Unauthorized");
    }

    let resp = call_service(&app, TestRequest::get().uri("/api/auth/status").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body, json!({ "isAuthenticated": false, "isLoggedIn": false }));

    // logout without a session still succeeds
    let resp = call_service(&app, TestRequest::post().uri("/api/auth/logout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_bad_input_reported_with_kind() {
    let state = app_state(Arc::new(FakeChainClient::new()));
    let app = test_app!(state);

    let resp = call_service(
        &app,
        TestRequest::post()
            .uri("/api/auth/nonce")
            .set_json(json!({ "address": "not-an-address" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "InvalidAddress");

    let resp = call_service(
        &app,
        TestRequest::post()
            .uri("/api/auth/nonce")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "InvalidRequest");
}

#[actix_web::test]
async fn test_payment_failures() {
    let chain = Arc::new(FakeChainClient::new());
    let state = app_state(chain.clone());
    let app = test_app!(state);
    let key = test_signing_key(23);
    let cookie = sign_in!(app, key);

    let confirm = |tx: &str| {
        TestRequest::post()
            .uri("/api/payment/confirm")
            .cookie(cookie.clone())
            .set_json(json!({ "txHash": tx }))
            .to_request()
    };

    let resp = call_service(&app, confirm("0x1234")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "InvalidTxHash");

    let resp = call_service(&app, confirm(&tx_hash("b1"))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "TransactionNotFound");

    // paid by someone else
    let stranger = address_of(&test_signing_key(24));
    let tx = tx_hash("b2");
    chain.insert_receipt(payment_receipt(&tx, TEST_PAYMENT_CONTRACT, Some(&stranger), U256::from(1_000u64)));
    let resp = call_service(&app, confirm(&tx)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "PayerMismatch");

    chain.set_unavailable(true);
    let resp = call_service(&app, confirm(&tx_hash("b3"))).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["kind"], "UpstreamUnavailable");

    let resp = call_service(&app, TestRequest::get().uri("/api/app").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
}

#[actix_web::test]
async fn test_staking_status() {
    let chain = Arc::new(FakeChainClient::new());
    let state = app_state(chain.clone());
    let app = test_app!(state);
    let key = test_signing_key(25);
    let cookie = sign_in!(app, key);

    let resp = call_service(&app, TestRequest::get().uri("/api/staking/status").cookie(cookie.clone()).to_request()).await;
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["status"], "waiting_for_staking");
    assert_eq!(body["hasStaked"], false);

    chain.set_staked_balance(&address_of(&key), U256::from(150u64));
    let resp = call_service(&app, TestRequest::get().uri("/api/staking/status").cookie(cookie).to_request()).await;
    let body: Value = read_body_json(resp).await;
    assert_eq!(body["status"], "has_staked");
    assert_eq!(body["stakedAmount"], "150");
    assert_eq!(body["minStakedAmount"], "100");
}
