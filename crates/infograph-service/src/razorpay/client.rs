//! Razorpay API client implementation.

use reqwest::Client;
use std::time::Duration;

use super::types::{CreateOrderRequest, Order, RazorpayErrorResponse};

/// Error type for Razorpay operations.
#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    /// HTTP request failed (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay API returned an error.
    #[error("Razorpay API error ({status}): {code} - {description}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code.
        code: String,
        /// Error description.
        description: String,
    },

    /// Order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

impl RazorpayError {
    /// Whether retrying the same call could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::OrderNotFound(_) => false,
        }
    }
}

/// Razorpay API client.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (`https://api.razorpay.com/v1` in production)
    /// * `key_id` - Public key id (`rzp_test_...` or `rzp_live_...`)
    /// * `key_secret` - Key secret, also used to verify payment signatures
    /// * `timeout` - Bound on each outbound call
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RazorpayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Public key id handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Secret used to verify payment signatures.
    #[must_use]
    pub fn key_secret(&self) -> &str {
        &self.key_secret
    }

    /// Create an order.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, RazorpayError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Fetch an order by id.
    pub async fn fetch_order(&self, order_id: &str) -> Result<Order, RazorpayError> {
        let response = self
            .client
            .get(format!("{}/orders/{}", self.base_url, order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RazorpayError::OrderNotFound(order_id.to_string()));
        }

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RazorpayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, description) = match serde_json::from_str::<RazorpayErrorResponse>(&body) {
            Ok(err) => (err.error.code, err.error.description),
            Err(_) => ("UNKNOWN".to_string(), format!("HTTP {status}")),
        };

        Err(RazorpayError::Api {
            status: status.as_u16(),
            code,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_classify_by_status() {
        let server = RazorpayError::Api {
            status: 503,
            code: "SERVER_ERROR".into(),
            description: String::new(),
        };
        let rejected = RazorpayError::Api {
            status: 400,
            code: "BAD_REQUEST_ERROR".into(),
            description: String::new(),
        };
        assert!(server.is_transient());
        assert!(!rejected.is_transient());
        assert!(!RazorpayError::OrderNotFound("order_1".into()).is_transient());
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = RazorpayClient::new(
            "http://localhost:9999/v1/",
            "rzp_test_key",
            "secret",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1");
        assert_eq!(client.key_id(), "rzp_test_key");
    }
}
