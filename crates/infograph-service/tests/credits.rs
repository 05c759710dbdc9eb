//! Credit balance and debit integration tests.

mod common;

use axum::http::StatusCode;
use common::{auth_header_for, TestHarness};
use infograph_core::{AccountId, Product};
use serde_json::json;

async fn debit(harness: &TestHarness) -> axum_test::TestResponse {
    harness
        .server
        .post("/v1/credits/debit")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "accountId": harness.account_id.to_string() }))
        .await
}

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn get_balance_success() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 0);
    assert_eq!(body["accountId"], harness.account_id.to_string());
}

#[tokio::test]
async fn get_balance_without_account_fails() {
    let harness = TestHarness::without_razorpay();

    harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn get_balance_without_auth_fails() {
    let harness = TestHarness::without_razorpay();

    harness
        .server
        .get("/v1/credits/balance")
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Debit
// ============================================================================

#[tokio::test]
async fn debit_at_zero_is_refused() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    let response = debit(&harness).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    assert_eq!(body["details"]["balance"], 0);
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn ten_credits_cover_ten_exports() {
    let harness = TestHarness::new().await;
    harness.register().await;
    harness.purchase("order_ten", "pay_ten", Product::ProPack).await;

    for expected in (0..10).rev() {
        let response = debit(&harness).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["creditsRemaining"], expected);
    }

    let response = debit(&harness).await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn concurrent_debits_spend_last_credit_once() {
    let harness = TestHarness::new().await;
    harness.register().await;
    harness.purchase("order_race", "pay_race", Product::ProPack).await;
    for _ in 0..9 {
        debit(&harness).await.assert_status_ok();
    }

    let (first, second) = tokio::join!(debit(&harness), debit(&harness));

    let statuses = [first.status_code().as_u16(), second.status_code().as_u16()];
    assert!(statuses.contains(&200), "one debit must succeed: {statuses:?}");
    assert!(statuses.contains(&400), "one debit must fail: {statuses:?}");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn debit_of_another_account_is_forbidden() {
    let harness = TestHarness::new().await;
    harness.register().await;
    harness.purchase("order_iso", "pay_iso", Product::ProPack).await;

    let intruder = AccountId::generate();
    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("authorization", auth_header_for(&intruder))
        .json(&json!({ "accountId": harness.account_id.to_string() }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(harness.balance().await, 10);
}

#[tokio::test]
async fn debit_without_auth_fails() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    harness
        .server
        .post("/v1/credits/debit")
        .json(&json!({ "accountId": harness.account_id.to_string() }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn debit_with_malformed_body_is_invalid_request() {
    let harness = TestHarness::without_razorpay();
    harness.register().await;

    let response = harness
        .server
        .post("/v1/credits/debit")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "accountId": "nope" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn debit_for_unregistered_account_is_not_found() {
    let harness = TestHarness::without_razorpay();

    debit(&harness).await.assert_status_not_found();
}
