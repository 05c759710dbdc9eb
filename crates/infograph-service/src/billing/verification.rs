//! Payment verification: the only path that grants credits.
//!
//! Per `(order_id, payment_id)` the request moves from `received` through
//! `signature_checked` to exactly one of `duplicate_by_payment`,
//! `replay_by_order`, `signature_invalid` or `credited`. The steps run in a
//! fixed order:
//!
//! 1. identity binding
//! 2. duplicate-by-payment
//! 3. replay-by-order
//! 4. signature check, then order resolution against the price table
//! 5. atomic claim + credit, then the success audit record
//!
//! Step 5 runs on a detached task so a dropped connection cannot abandon it
//! between the credit and the audit insert.

use std::sync::Arc;

use infograph_core::{
    AccountId, Currency, OrderId, PaymentClaim, PaymentId, PaymentRecord, Price, Product,
};
use infograph_store::{Settlement, Store, StoreError};

use crate::auth::AuthUser;
use crate::billing::orders::provider_error;
use crate::crypto::verify_payment_signature;
use crate::error::ApiError;
use crate::razorpay::RazorpayError;
use crate::state::AppState;

/// A payment confirmation with validated identifiers.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// Provider order id.
    pub order_id: OrderId,
    /// Provider payment id.
    pub payment_id: PaymentId,
    /// Hex HMAC-SHA256 of `order_id|payment_id`.
    pub signature: String,
    /// Account the client wants credited.
    pub account_id: Option<AccountId>,
}

impl PaymentConfirmation {
    /// Validate raw request fields.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingDetails` if a field is absent, blank or malformed.
    pub fn parse(
        order_id: Option<&str>,
        payment_id: Option<&str>,
        signature: Option<&str>,
        account_id: Option<&str>,
    ) -> Result<Self, ApiError> {
        let present = |value: Option<&str>, name: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ApiError::MissingDetails(format!("{name} is required")))
        };

        let order_id = present(order_id, "orderId")?
            .parse()
            .map_err(|_| ApiError::MissingDetails("orderId is malformed".into()))?;
        let payment_id = present(payment_id, "paymentId")?
            .parse()
            .map_err(|_| ApiError::MissingDetails("paymentId is malformed".into()))?;
        let signature = present(signature, "signature")?;
        let account_id = account_id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .transpose()
            .map_err(|_| ApiError::MissingDetails("accountId is malformed".into()))?;

        Ok(Self {
            order_id,
            payment_id,
            signature,
            account_id,
        })
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// The payment had already been credited; nothing changed.
    pub duplicate: bool,
    /// Credits granted by this call.
    pub credits_granted: i64,
    /// Balance after the call.
    pub total_credits: i64,
}

/// Verify a payment confirmation and credit the account exactly once.
pub async fn verify_payment(
    state: &AppState,
    caller: Option<&AuthUser>,
    confirmation: PaymentConfirmation,
) -> Result<VerificationOutcome, ApiError> {
    let PaymentConfirmation {
        order_id,
        payment_id,
        signature,
        account_id: requested,
    } = confirmation;

    // 1. Identity binding.
    if let (Some(caller), Some(requested)) = (caller, requested) {
        if caller.account_id != requested {
            tracing::warn!(
                caller = %caller.account_id,
                account_id = %requested,
                order_id = %order_id,
                payment_id = %payment_id,
                "Payment verification requested for another account"
            );
            return Err(ApiError::UserMismatch);
        }
    }
    let requester = requested.or(caller.map(|c| c.account_id));

    // 2. Duplicate by payment.
    if let Some(existing) = state.store.get_successful_payment(&payment_id).await? {
        // Without a named account, the provider signature stands in for ownership.
        let signed = requester.is_none()
            && state.razorpay.as_ref().is_some_and(|razorpay| {
                verify_payment_signature(razorpay.key_secret(), &order_id, &payment_id, &signature)
            });
        return duplicate_outcome(state.store.as_ref(), &existing, &order_id, requester, signed)
            .await;
    }

    // 3. Replay by order.
    if let Some(existing) = state.store.get_successful_payment_for_order(&order_id).await? {
        if existing.payment_id != payment_id {
            return Err(reject_replay(
                state.store.as_ref(),
                order_id,
                payment_id,
                requester,
                &existing.payment_id,
            )
            .await);
        }
    }

    // 4. Signature.
    let razorpay = state.razorpay.as_ref().ok_or(ApiError::Misconfigured)?;
    if !verify_payment_signature(razorpay.key_secret(), &order_id, &payment_id, &signature) {
        tracing::warn!(
            order_id = %order_id,
            payment_id = %payment_id,
            account_id = ?requester.map(|id| id.to_string()),
            "Payment signature mismatch"
        );
        let record = PaymentRecord::signature_failed(order_id, payment_id, requester);
        if let Err(e) = state.store.insert_payment_record(&record).await {
            tracing::error!(error = %e, record_id = %record.id, "Failed to record signature failure");
        }
        return Err(ApiError::InvalidSignature);
    }

    // 4b. Resolve what was bought and for whom.
    let order = razorpay.fetch_order(order_id.as_str()).await.map_err(|e| match e {
        RazorpayError::OrderNotFound(_) => ApiError::BadRequest("unknown order".into()),
        other => provider_error(&other),
    })?;
    tracing::debug!(order_id = %order_id, status = %order.status, "Order fetched");

    let notes = order.notes();
    let price = resolve_price(state, &order_id, &order.currency, notes.product.as_deref(), order.amount)?;

    let noted_account = notes
        .account_id
        .as_deref()
        .map(str::parse::<AccountId>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("order carries a malformed account id".into()))?;

    let account_id = match (requester, noted_account) {
        (Some(requester), Some(noted)) if requester != noted => {
            tracing::warn!(
                account_id = %requester,
                order_account = %noted,
                order_id = %order_id,
                "Payment verification for an order opened by another account"
            );
            return Err(ApiError::UserMismatch);
        }
        (requester, noted) => requester
            .or(noted)
            .ok_or_else(|| ApiError::MissingDetails("accountId is required".into()))?,
    };

    match state.store.get_account(&account_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(ApiError::ProfileNotFound),
        Err(e) => return Err(ApiError::Profile(e.to_string())),
    }

    // 5. Credit and record, to completion.
    let claim = PaymentClaim::new(order_id, payment_id, account_id, price.credits);
    let store = Arc::clone(&state.store);
    tokio::spawn(async move { settle(store.as_ref(), claim, price).await })
        .await
        .map_err(|e| ApiError::Internal(format!("settlement task failed: {e}")))?
}

/// Check the provider's order against the price table.
fn resolve_price(
    state: &AppState,
    order_id: &OrderId,
    currency: &str,
    product: Option<&str>,
    amount: i64,
) -> Result<Price, ApiError> {
    let currency: Currency = currency.parse()?;
    let product: Product = product
        .ok_or_else(|| ApiError::BadRequest("order is not a credit purchase".into()))?
        .parse()?;
    let price = state.config.pricing.price(currency, product)?;

    if amount != price.amount {
        tracing::warn!(
            order_id = %order_id,
            charged = amount,
            expected = price.amount,
            product = %product,
            currency = %currency,
            "Order amount does not match the price table"
        );
        return Err(ApiError::BadRequest("order amount does not match price".into()));
    }

    Ok(price)
}

/// Claim, credit, then write the audit record.
async fn settle(
    store: &dyn Store,
    claim: PaymentClaim,
    price: Price,
) -> Result<VerificationOutcome, ApiError> {
    let settlement = match store.settle_payment(&claim).await {
        Ok(settlement) => settlement,
        Err(StoreError::NotFound { .. }) => return Err(ApiError::ProfileNotFound),
        Err(e) => {
            tracing::error!(
                error = %e,
                account_id = %claim.account_id,
                payment_id = %claim.payment_id,
                "Ledger credit failed"
            );
            return Err(ApiError::CreditUpdate(e.to_string()));
        }
    };

    match settlement {
        Settlement::Credited { balance } => {
            let record = PaymentRecord::success(&claim, price.amount, price.currency, price.product);
            if let Err(e) = store.insert_payment_record(&record).await {
                tracing::error!(
                    error = %e,
                    reconciliation_required = true,
                    account_id = %claim.account_id,
                    order_id = %claim.order_id,
                    payment_id = %claim.payment_id,
                    credits = claim.credits,
                    "Credits granted but payment record insert failed"
                );
            }

            tracing::info!(
                account_id = %claim.account_id,
                order_id = %claim.order_id,
                payment_id = %claim.payment_id,
                credits = claim.credits,
                balance,
                "Payment verified and credited"
            );

            Ok(VerificationOutcome {
                duplicate: false,
                credits_granted: claim.credits,
                total_credits: balance,
            })
        }
        Settlement::PaymentAlreadySettled { account_id } if account_id == claim.account_id => {
            tracing::info!(
                account_id = %account_id,
                payment_id = %claim.payment_id,
                "Payment settled concurrently, returning duplicate"
            );
            let total_credits = current_balance(store, &account_id).await?;
            Ok(VerificationOutcome {
                duplicate: true,
                credits_granted: 0,
                total_credits,
            })
        }
        Settlement::PaymentAlreadySettled { account_id } => {
            tracing::warn!(
                account_id = %claim.account_id,
                owner = %account_id,
                payment_id = %claim.payment_id,
                "Payment already settled for another account"
            );
            Err(ApiError::AlreadyVerified)
        }
        Settlement::OrderAlreadySettled { payment_id } => Err(reject_replay(
            store,
            claim.order_id,
            claim.payment_id,
            Some(claim.account_id),
            &payment_id,
        )
        .await),
    }
}

async fn duplicate_outcome(
    store: &dyn Store,
    existing: &PaymentRecord,
    order_id: &OrderId,
    requester: Option<AccountId>,
    signed: bool,
) -> Result<VerificationOutcome, ApiError> {
    let owned = match requester {
        Some(_) => existing.account_id == requester,
        None => signed,
    };
    if !owned || existing.order_id != *order_id {
        tracing::warn!(
            payment_id = %existing.payment_id,
            account_id = ?requester.map(|id| id.to_string()),
            "Re-verification of a payment by a non-owner"
        );
        return Err(ApiError::AlreadyVerified);
    }

    let Some(owner) = existing.account_id else {
        return Err(ApiError::AlreadyVerified);
    };
    tracing::info!(
        account_id = %owner,
        payment_id = %existing.payment_id,
        "Duplicate payment verification"
    );

    Ok(VerificationOutcome {
        duplicate: true,
        credits_granted: 0,
        total_credits: current_balance(store, &owner).await?,
    })
}

async fn current_balance(store: &dyn Store, account_id: &AccountId) -> Result<i64, ApiError> {
    match store.get_account(account_id).await {
        Ok(Some(account)) => Ok(account.credits),
        Ok(None) => Err(ApiError::ProfileNotFound),
        Err(e) => Err(ApiError::Profile(e.to_string())),
    }
}

/// Audit and reject a second payment against a settled order.
async fn reject_replay(
    store: &dyn Store,
    order_id: OrderId,
    payment_id: PaymentId,
    account_id: Option<AccountId>,
    settled_by: &PaymentId,
) -> ApiError {
    tracing::error!(
        order_id = %order_id,
        payment_id = %payment_id,
        settled_by = %settled_by,
        account_id = ?account_id.map(|id| id.to_string()),
        "Replay rejected: order already settled by another payment"
    );

    let record = PaymentRecord::replay_rejected(order_id, payment_id, account_id);
    if let Err(e) = store.insert_payment_record(&record).await {
        tracing::error!(error = %e, record_id = %record.id, "Failed to record replay rejection");
    }

    ApiError::ReplayAttack
}
