//! Common test utilities for infograph service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use infograph_core::{
    Account, AccountId, OrderId, PaymentClaim, PaymentId, PaymentRecord, PaymentStatus, Product,
};
use infograph_service::auth::JwtClaims;
use infograph_service::crypto::sign_payment;
use infograph_service::{create_router, AppState, ServiceConfig};
use infograph_store::{MemoryStore, Settlement, Store, StoreError};

/// Shared secret for test tokens.
pub const JWT_SECRET: &str = "test-jwt-secret";
/// Razorpay key id handed to the checkout widget.
pub const KEY_ID: &str = "rzp_test_key";
/// Razorpay key secret used for payment signatures.
pub const KEY_SECRET: &str = "rzp_test_secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The ledger behind the server.
    pub store: Arc<dyn Store>,
    /// Stand-in for the Razorpay Orders API, if configured.
    pub razorpay: Option<MockServer>,
    /// A test account for authenticated requests.
    pub account_id: AccountId,
}

impl TestHarness {
    /// Harness with an in-memory ledger and a mocked Razorpay.
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// Harness over a caller-supplied store.
    pub async fn with_store(store: Arc<dyn Store>) -> Self {
        let razorpay = MockServer::start().await;
        let config = ServiceConfig {
            razorpay_key_id: Some(KEY_ID.into()),
            razorpay_key_secret: Some(KEY_SECRET.into()),
            razorpay_api_url: format!("{}/v1", razorpay.uri()),
            provider_timeout_seconds: 2,
            ..base_config()
        };
        Self::build(store, config, Some(razorpay))
    }

    /// Harness with no payment provider credentials.
    pub fn without_razorpay() -> Self {
        Self::build(Arc::new(MemoryStore::new()), base_config(), None)
    }

    fn build(store: Arc<dyn Store>, config: ServiceConfig, razorpay: Option<MockServer>) -> Self {
        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            razorpay,
            account_id: AccountId::generate(),
        }
    }

    /// Authorization header for the test account.
    pub fn auth_header(&self) -> String {
        auth_header_for(&self.account_id)
    }

    /// Register the test account through the API.
    pub async fn register(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.auth_header())
            .await
            .assert_status_ok();
    }

    /// Serve `GET /orders/{id}` for a paid order.
    pub async fn mock_order(
        &self,
        order_id: &str,
        account_id: Option<&AccountId>,
        product: Product,
        currency: &str,
        amount: i64,
    ) {
        let notes = match account_id {
            Some(id) => json!({
                "account_id": id.to_string(),
                "product": product.as_str(),
                "credits": product.credits().to_string(),
                "currency": currency,
            }),
            None => json!({ "product": product.as_str() }),
        };

        Mock::given(method("GET"))
            .and(path(format!("/v1/orders/{order_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": order_id,
                "entity": "order",
                "amount": amount,
                "amount_paid": amount,
                "currency": currency,
                "receipt": "rcpt_test",
                "status": "paid",
                "notes": notes,
            })))
            .mount(self.mock_server())
            .await;
    }

    /// Serve `POST /orders` with a freshly created order.
    pub async fn mock_order_creation(&self, order_id: &str, currency: &str, amount: i64) {
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": order_id,
                "entity": "order",
                "amount": amount,
                "amount_paid": 0,
                "currency": currency,
                "receipt": "rcpt_test",
                "status": "created",
                "notes": [],
            })))
            .mount(self.mock_server())
            .await;
    }

    /// Verify a correctly signed USD purchase for the test account.
    pub async fn purchase(&self, order_id: &str, payment_id: &str, product: Product) -> serde_json::Value {
        let amount = match product {
            Product::ProPack => 499,
            Product::Business => 1999,
        };
        self.mock_order(order_id, Some(&self.account_id), product, "USD", amount)
            .await;

        let response = self
            .server
            .post("/v1/payments/verify")
            .add_header("authorization", self.auth_header())
            .json(&json!({
                "orderId": order_id,
                "paymentId": payment_id,
                "signature": sign(order_id, payment_id),
                "accountId": self.account_id.to_string(),
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Balance as seen by the ledger.
    pub async fn balance(&self) -> i64 {
        self.store
            .get_account(&self.account_id)
            .await
            .expect("store read")
            .map_or(0, |a| a.credits)
    }

    fn mock_server(&self) -> &MockServer {
        self.razorpay.as_ref().expect("Razorpay mock not configured")
    }
}

fn base_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        auth_jwt_secret: JWT_SECRET.into(),
        cors_origins: vec!["*".into()],
        max_body_bytes: 1024 * 1024,
        ..ServiceConfig::default()
    }
}

/// Mint a bearer header for an account.
pub fn auth_header_for(account_id: &AccountId) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs();
    let claims = JwtClaims {
        sub: account_id.to_string(),
        exp: i64::try_from(now).expect("timestamp fits") + 3600,
        iat: None,
        aud: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token");
    format!("Bearer {token}")
}

/// Razorpay checkout signature for `order_id|payment_id`.
pub fn sign(order_id: &str, payment_id: &str) -> String {
    let order_id: OrderId = order_id.parse().expect("valid order id");
    let payment_id: PaymentId = payment_id.parse().expect("valid payment id");
    sign_payment(KEY_SECRET, &order_id, &payment_id)
}

/// Flip the lowest bit of the first hex digit.
pub fn tamper(signature: &str) -> String {
    let mut chars: Vec<char> = signature.chars().collect();
    let digit = chars[0].to_digit(16).expect("hex digit");
    chars[0] = std::char::from_digit(digit ^ 1, 16).expect("hex digit");
    chars.into_iter().collect()
}

/// A store whose success audit inserts always fail.
pub struct FailingAuditStore {
    inner: MemoryStore,
}

impl FailingAuditStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl Store for FailingAuditStore {
    async fn get_account(&self, id: &AccountId) -> infograph_store::Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn create_account(&self, id: &AccountId) -> infograph_store::Result<Account> {
        self.inner.create_account(id).await
    }

    async fn debit_credit(&self, id: &AccountId) -> infograph_store::Result<i64> {
        self.inner.debit_credit(id).await
    }

    async fn settle_payment(&self, claim: &PaymentClaim) -> infograph_store::Result<Settlement> {
        self.inner.settle_payment(claim).await
    }

    async fn insert_payment_record(&self, record: &PaymentRecord) -> infograph_store::Result<()> {
        if record.status == PaymentStatus::Success {
            return Err(StoreError::Database("connection reset".into()));
        }
        self.inner.insert_payment_record(record).await
    }

    async fn get_successful_payment(
        &self,
        payment_id: &PaymentId,
    ) -> infograph_store::Result<Option<PaymentRecord>> {
        self.inner.get_successful_payment(payment_id).await
    }

    async fn get_successful_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> infograph_store::Result<Option<PaymentRecord>> {
        self.inner.get_successful_payment_for_order(order_id).await
    }

    async fn list_payments_by_account(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> infograph_store::Result<Vec<PaymentRecord>> {
        self.inner.list_payments_by_account(id, limit, offset).await
    }
}
