//! In-memory storage implementation.
//!
//! All state sits behind one mutex, which makes every operation linearizable.
//! The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use infograph_core::{Account, AccountId, OrderId, PaymentClaim, PaymentId, PaymentRecord};

use crate::error::{Result, StoreError};
use crate::{Settlement, Store};

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    claims: HashMap<PaymentId, PaymentClaim>,
    claimed_orders: HashMap<OrderId, PaymentId>,
    /// Append-only, in insertion order.
    records: Vec<PaymentRecord>,
}

/// Process-local storage backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.lock()?.accounts.get(id).cloned())
    }

    async fn create_account(&self, id: &AccountId) -> Result<Account> {
        let mut inner = self.lock()?;
        Ok(inner
            .accounts
            .entry(*id)
            .or_insert_with(|| Account::new(*id))
            .clone())
    }

    async fn debit_credit(&self, id: &AccountId) -> Result<i64> {
        let mut inner = self.lock()?;
        let account = inner
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::account_not_found(id))?;

        if account.credits <= 0 {
            return Err(StoreError::InsufficientCredits {
                balance: account.credits,
                required: 1,
            });
        }

        account.credits -= 1;
        account.updated_at = Utc::now();
        Ok(account.credits)
    }

    async fn settle_payment(&self, claim: &PaymentClaim) -> Result<Settlement> {
        let mut inner = self.lock()?;

        if let Some(existing) = inner.claims.get(&claim.payment_id) {
            return Ok(Settlement::PaymentAlreadySettled {
                account_id: existing.account_id,
            });
        }
        if let Some(payment_id) = inner.claimed_orders.get(&claim.order_id) {
            return Ok(Settlement::OrderAlreadySettled {
                payment_id: payment_id.clone(),
            });
        }

        let account = inner
            .accounts
            .get_mut(&claim.account_id)
            .ok_or_else(|| StoreError::account_not_found(&claim.account_id))?;
        account.credits += claim.credits;
        account.updated_at = Utc::now();
        let balance = account.credits;

        inner
            .claimed_orders
            .insert(claim.order_id.clone(), claim.payment_id.clone());
        inner.claims.insert(claim.payment_id.clone(), claim.clone());

        Ok(Settlement::Credited { balance })
    }

    async fn insert_payment_record(&self, record: &PaymentRecord) -> Result<()> {
        let mut inner = self.lock()?;

        if record.is_success() {
            for existing in inner.records.iter().filter(|r| r.is_success()) {
                if existing.payment_id == record.payment_id {
                    return Err(StoreError::DuplicatePayment {
                        payment_id: record.payment_id.to_string(),
                    });
                }
                if existing.order_id == record.order_id {
                    return Err(StoreError::OrderAlreadySettled {
                        order_id: record.order_id.to_string(),
                    });
                }
            }
        }

        inner.records.push(record.clone());
        Ok(())
    }

    async fn get_successful_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>> {
        Ok(self
            .lock()?
            .records
            .iter()
            .find(|r| r.is_success() && &r.payment_id == payment_id)
            .cloned())
    }

    async fn get_successful_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>> {
        Ok(self
            .lock()?
            .records
            .iter()
            .find(|r| r.is_success() && &r.order_id == order_id)
            .cloned())
    }

    async fn list_payments_by_account(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .lock()?
            .records
            .iter()
            .rev()
            .filter(|r| r.account_id.as_ref() == Some(id))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infograph_core::{Currency, Product};

    fn claim(order: &str, payment: &str, account_id: AccountId, credits: i64) -> PaymentClaim {
        PaymentClaim::new(order.parse().unwrap(), payment.parse().unwrap(), account_id, credits)
    }

    #[tokio::test]
    async fn create_account_is_get_or_create() {
        let store = MemoryStore::new();
        let id = AccountId::generate();

        let first = store.create_account(&id).await.unwrap();
        store.settle_payment(&claim("order_1", "pay_1", id, 10)).await.unwrap();
        let second = store.create_account(&id).await.unwrap();

        assert_eq!(first.credits, 0);
        assert_eq!(second.credits, 10);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn settle_requires_existing_account() {
        let store = MemoryStore::new();
        let id = AccountId::generate();

        let err = store
            .settle_payment(&claim("order_1", "pay_1", id, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "account", .. }));

        // The failed settlement must not leave a claim behind.
        store.create_account(&id).await.unwrap();
        let settlement = store
            .settle_payment(&claim("order_1", "pay_1", id, 10))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Credited { balance: 10 });
    }

    #[tokio::test]
    async fn success_records_are_unique_per_payment_and_order() {
        let store = MemoryStore::new();
        let id = AccountId::generate();
        let first = claim("order_1", "pay_1", id, 10);
        let record = PaymentRecord::success(&first, 499, Currency::Usd, Product::ProPack);
        store.insert_payment_record(&record).await.unwrap();

        let again = PaymentRecord::success(&first, 499, Currency::Usd, Product::ProPack);
        assert!(matches!(
            store.insert_payment_record(&again).await,
            Err(StoreError::DuplicatePayment { .. })
        ));

        let other = claim("order_1", "pay_2", id, 10);
        let other = PaymentRecord::success(&other, 499, Currency::Usd, Product::ProPack);
        assert!(matches!(
            store.insert_payment_record(&other).await,
            Err(StoreError::OrderAlreadySettled { .. })
        ));

        // Failure records never conflict.
        for _ in 0..2 {
            let failed = PaymentRecord::signature_failed(
                "order_1".parse().unwrap(),
                "pay_1".parse().unwrap(),
                Some(id),
            );
            store.insert_payment_record(&failed).await.unwrap();
        }
        let listed = store.list_payments_by_account(&id, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[2].is_success());
    }
}
