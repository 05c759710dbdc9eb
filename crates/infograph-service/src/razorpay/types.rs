//! Razorpay API types.

use serde::{Deserialize, Serialize};

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt id (max 40 characters).
    pub receipt: String,
    /// Metadata echoed back on the order.
    pub notes: OrderNotes,
}

/// Metadata attached to an order at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotes {
    /// Account to credit, when known at checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Product wire name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Credits the order is worth, as a string (Razorpay notes are strings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<String>,
    /// ISO currency code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// A Razorpay order.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Order id (`order_...`).
    pub id: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Amount captured so far.
    #[serde(default)]
    pub amount_paid: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt id.
    #[serde(default)]
    pub receipt: Option<String>,
    /// `created`, `attempted` or `paid`.
    pub status: String,
    /// Razorpay returns `[]` instead of `{}` when no notes were set.
    #[serde(default)]
    pub notes: serde_json::Value,
}

impl Order {
    /// Parse the notes object, treating anything else as empty.
    #[must_use]
    pub fn notes(&self) -> OrderNotes {
        match &self.notes {
            serde_json::Value::Object(_) => {
                serde_json::from_value(self.notes.clone()).unwrap_or_default()
            }
            _ => OrderNotes::default(),
        }
    }
}

/// Razorpay error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorResponse {
    /// Error details.
    pub error: RazorpayErrorBody,
}

/// Razorpay error details.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorBody {
    /// Error code (e.g. `BAD_REQUEST_ERROR`).
    pub code: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_notes_array_is_tolerated() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "order_1",
            "amount": 499,
            "currency": "USD",
            "status": "created",
            "notes": []
        }))
        .unwrap();
        assert_eq!(order.notes(), OrderNotes::default());
    }

    #[test]
    fn notes_object_is_parsed() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "order_1",
            "amount": 499,
            "amount_paid": 499,
            "currency": "USD",
            "status": "paid",
            "notes": { "product": "proPack", "credits": "10", "extra": "ignored" }
        }))
        .unwrap();
        let notes = order.notes();
        assert_eq!(notes.product.as_deref(), Some("proPack"));
        assert_eq!(notes.credits.as_deref(), Some("10"));
        assert_eq!(notes.account_id, None);
    }
}
