//! Infograph HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use infograph_core::AccountId;

use crate::error::ClientError;
use crate::types::{
    AccountResponse, ApiErrorResponse, BalanceResponse, CreateOrderRequest, CreateOrderResponse,
    DebitRequest, DebitResponse, OrderConfigResponse, PricingResponse, VerifyPaymentRequest,
    VerifyPaymentResponse,
};

/// Infograph API client.
///
/// Provides methods for reading balances, spending credits and buying more.
/// Every authenticated call takes the user's bearer token explicitly.
#[derive(Debug, Clone)]
pub struct InfographClient {
    client: Client,
    base_url: String,
    options: ClientOptions,
}

impl InfographClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the infograph service (e.g., `"http://infograph:8080"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
        })
    }

    /// Register the caller's account, or fetch it if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_account(&self, token: &str) -> Result<AccountResponse, ClientError> {
        let request = self
            .client
            .post(self.url("/v1/accounts"))
            .bearer_auth(token);

        self.send(request).await
    }

    /// Get the caller's balance.
    ///
    /// The balance is advisory: it can change between this call and a debit.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccountNotFound` if the account is not registered.
    pub async fn get_balance(&self, token: &str) -> Result<BalanceResponse, ClientError> {
        let request = self
            .client
            .get(self.url("/v1/credits/balance"))
            .bearer_auth(token);

        self.send(request).await
    }

    /// Spend one credit.
    ///
    /// Not retried: a debit whose response was lost may already have been applied.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientCredits` if the balance is zero.
    pub async fn debit_credit(
        &self,
        token: &str,
        account_id: &AccountId,
    ) -> Result<DebitResponse, ClientError> {
        let request = self
            .client
            .post(self.url("/v1/credits/debit"))
            .bearer_auth(token)
            .json(&DebitRequest {
                account_id: *account_id,
            });

        self.send(request).await
    }

    /// Open a provider order for a credit pack.
    ///
    /// Transient failures are retried with exponential backoff, since an
    /// unpaid order grants nothing.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted.
    pub async fn create_order(
        &self,
        token: Option<&str>,
        order: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ClientError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.client.post(self.url("/v1/orders")).json(order);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            match self.send(request).await {
                Err(e) if e.is_retryable() && attempt < self.options.max_attempts => {
                    let backoff = self.options.initial_backoff_ms * 2u64.pow(attempt - 1);
                    tracing::warn!(attempt, backoff_ms = backoff, error = %e, "Order creation failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                result => return result,
            }
        }
    }

    /// Submit a checkout confirmation for verification.
    ///
    /// Safe to call again with the same confirmation: a repeat returns
    /// `duplicate = true` and grants nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn verify_payment(
        &self,
        token: Option<&str>,
        confirmation: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        let mut request = self
            .client
            .post(self.url("/v1/payments/verify"))
            .json(confirmation);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        self.send(request).await
    }

    /// Whether checkout is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn order_config(&self) -> Result<OrderConfigResponse, ClientError> {
        self.send(self.client.get(self.url("/v1/orders/config"))).await
    }

    /// Fetch the price table.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn pricing(&self) -> Result<PricingResponse, ClientError> {
        self.send(self.client.get(self.url("/v1/pricing"))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let detail = |key: &str| {
                    api_error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                };

                match api_error.code.as_str() {
                    "INSUFFICIENT_CREDITS" => Err(ClientError::InsufficientCredits {
                        balance: detail("balance").unwrap_or(0),
                        required: detail("required").unwrap_or(1),
                    }),
                    "ACCOUNT_NOT_FOUND" => Err(ClientError::AccountNotFound),
                    "UNAUTHORIZED" => Err(ClientError::Unauthorized),
                    code => Err(ClientError::Api {
                        code: code.to_string(),
                        message: api_error.error,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "UNKNOWN".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Attempts for order creation, including the first (default: 3).
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 500).
    pub initial_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = InfographClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = InfographClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url("/v1/pricing"), "http://localhost:8080/v1/pricing");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions {
            max_attempts: 1,
            ..ClientOptions::default()
        };
        let client = InfographClient::with_options("http://localhost:8080", options).unwrap();
        assert_eq!(client.options.max_attempts, 1);
    }
}
