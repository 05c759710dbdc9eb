//! Account integration tests.

mod common;

use common::{auth_header_for, TestHarness};
use infograph_core::AccountId;

#[tokio::test]
async fn create_account_starts_at_zero() {
    let harness = TestHarness::without_razorpay();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accountId"], harness.account_id.to_string());
    assert_eq!(body["credits"], 0);
}

#[tokio::test]
async fn create_account_is_idempotent() {
    let harness = TestHarness::new().await;
    harness.register().await;
    harness.purchase("order_acct1", "pay_acct1", infograph_core::Product::ProPack).await;

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 10);
}

#[tokio::test]
async fn get_account_success() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accountId"], harness.account_id.to_string());
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn get_account_not_found() {
    let harness = TestHarness::without_razorpay();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn account_requires_auth() {
    let harness = TestHarness::without_razorpay();

    harness
        .server
        .post("/v1/accounts")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() {
    let harness = TestHarness::without_razorpay();
    let claims = infograph_service::auth::JwtClaims {
        sub: AccountId::generate().to_string(),
        exp: i64::MAX / 2,
        iat: None,
        aud: None,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", format!("Bearer {token}"))
        .await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn accounts_are_isolated() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    let other = AccountId::generate();
    harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", auth_header_for(&other))
        .await
        .assert_status_not_found();
}
