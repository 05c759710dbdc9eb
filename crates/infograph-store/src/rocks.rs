//! `RocksDB` storage implementation.
//!
//! Read-modify-write sequences on the ledger run under `ledger_lock`, and each
//! one is committed with a single `WriteBatch`, so a settlement's claim and
//! credit land together.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use infograph_core::{
    Account, AccountId, OrderId, PaymentClaim, PaymentId, PaymentRecord, PaymentRecordId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Settlement, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    ledger_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            ledger_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, ()>> {
        self.ledger_lock
            .lock()
            .map_err(|_| StoreError::Database("ledger lock poisoned".into()))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_record(&self, id: &PaymentRecordId) -> Result<Option<PaymentRecord>> {
        self.get(cf::PAYMENT_RECORDS, &keys::record_key(id))
    }

    /// Resolve a success index entry to its record.
    fn success_record(&self, index_cf: &str, key: &[u8]) -> Result<Option<PaymentRecord>> {
        match self.get::<PaymentRecordId>(index_cf, key)? {
            Some(record_id) => self.get_record(&record_id),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        self.get(cf::ACCOUNTS, &keys::account_key(id))
    }

    async fn create_account(&self, id: &AccountId) -> Result<Account> {
        let _guard = self.lock_ledger()?;
        if let Some(existing) = self.get(cf::ACCOUNTS, &keys::account_key(id))? {
            return Ok(existing);
        }

        let account = Account::new(*id);
        let cf = self.cf(cf::ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, keys::account_key(id), Self::serialize(&account)?);
        self.write(batch)?;

        tracing::debug!(account_id = %id, "Account created");
        Ok(account)
    }

    async fn debit_credit(&self, id: &AccountId) -> Result<i64> {
        let _guard = self.lock_ledger()?;
        let key = keys::account_key(id);
        let mut account: Account = self
            .get(cf::ACCOUNTS, &key)?
            .ok_or_else(|| StoreError::account_not_found(id))?;

        if account.credits <= 0 {
            return Err(StoreError::InsufficientCredits {
                balance: account.credits,
                required: 1,
            });
        }

        account.credits -= 1;
        account.updated_at = chrono::Utc::now();

        let cf = self.cf(cf::ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, key, Self::serialize(&account)?);
        self.write(batch)?;

        Ok(account.credits)
    }

    async fn settle_payment(&self, claim: &PaymentClaim) -> Result<Settlement> {
        let _guard = self.lock_ledger()?;

        let payment_key = keys::payment_key(&claim.payment_id);
        let order_key = keys::order_key(&claim.order_id);

        if let Some(existing) = self.get::<PaymentClaim>(cf::CLAIMS, &payment_key)? {
            return Ok(Settlement::PaymentAlreadySettled {
                account_id: existing.account_id,
            });
        }
        if let Some(payment_id) = self.get::<PaymentId>(cf::CLAIMED_ORDERS, &order_key)? {
            return Ok(Settlement::OrderAlreadySettled { payment_id });
        }

        let account_key = keys::account_key(&claim.account_id);
        let mut account: Account = self
            .get(cf::ACCOUNTS, &account_key)?
            .ok_or_else(|| StoreError::account_not_found(&claim.account_id))?;
        account.credits += claim.credits;
        account.updated_at = chrono::Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_claims = self.cf(cf::CLAIMS)?;
        let cf_orders = self.cf(cf::CLAIMED_ORDERS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_claims, &payment_key, Self::serialize(claim)?);
        batch.put_cf(&cf_orders, &order_key, Self::serialize(&claim.payment_id)?);
        batch.put_cf(&cf_accounts, &account_key, Self::serialize(&account)?);
        self.write(batch)?;

        Ok(Settlement::Credited {
            balance: account.credits,
        })
    }

    async fn insert_payment_record(&self, record: &PaymentRecord) -> Result<()> {
        let _guard = self.lock_ledger()?;

        let cf_records = self.cf(cf::PAYMENT_RECORDS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_records, keys::record_key(&record.id), Self::serialize(record)?);

        if let Some(account_id) = &record.account_id {
            let cf_by_account = self.cf(cf::RECORDS_BY_ACCOUNT)?;
            batch.put_cf(&cf_by_account, keys::account_record_key(account_id, &record.id), []);
        }

        if record.is_success() {
            let payment_key = keys::payment_key(&record.payment_id);
            let order_key = keys::order_key(&record.order_id);
            let cf_by_payment = self.cf(cf::SUCCESS_BY_PAYMENT)?;
            let cf_by_order = self.cf(cf::SUCCESS_BY_ORDER)?;

            if self
                .db
                .get_cf(&cf_by_payment, &payment_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some()
            {
                return Err(StoreError::DuplicatePayment {
                    payment_id: record.payment_id.to_string(),
                });
            }
            if self
                .db
                .get_cf(&cf_by_order, &order_key)
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some()
            {
                return Err(StoreError::OrderAlreadySettled {
                    order_id: record.order_id.to_string(),
                });
            }

            let record_id = Self::serialize(&record.id)?;
            batch.put_cf(&cf_by_payment, &payment_key, &record_id);
            batch.put_cf(&cf_by_order, &order_key, &record_id);
        }

        self.write(batch)
    }

    async fn get_successful_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>> {
        self.success_record(cf::SUCCESS_BY_PAYMENT, &keys::payment_key(payment_id))
    }

    async fn get_successful_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>> {
        self.success_record(cf::SUCCESS_BY_ORDER, &keys::order_key(order_id))
    }

    async fn list_payments_by_account(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PaymentRecord>> {
        let cf_by_account = self.cf(cf::RECORDS_BY_ACCOUNT)?;
        let prefix = keys::account_records_prefix(id);

        let iter = self
            .db
            .iterator_cf(&cf_by_account, IteratorMode::From(&prefix, Direction::Forward));

        // ULIDs sort by time, so collecting forward and reversing gives newest first.
        let mut record_ids = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            if let Some(record_id) = keys::record_id_from_account_key(&key) {
                record_ids.push(record_id);
            }
        }

        let mut records = Vec::new();
        for record_id in record_ids.iter().rev().skip(offset).take(limit) {
            if let Some(record) = self.get_record(record_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infograph_core::{Currency, Product};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let id = AccountId::generate();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.create_account(&id).await.unwrap();
            let claim = PaymentClaim::new(
                "order_r1".parse().unwrap(),
                "pay_r1".parse().unwrap(),
                id,
                10,
            );
            store.settle_payment(&claim).await.unwrap();
            store.debit_credit(&id).await.unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 9);

        let again = PaymentClaim::new(
            "order_r1".parse().unwrap(),
            "pay_r1".parse().unwrap(),
            id,
            10,
        );
        assert_eq!(
            store.settle_payment(&again).await.unwrap(),
            Settlement::PaymentAlreadySettled { account_id: id }
        );
    }

    #[tokio::test]
    async fn success_indexes_resolve_records() {
        let (store, _dir) = create_test_store();
        let id = AccountId::generate();
        let claim = PaymentClaim::new(
            "order_r2".parse().unwrap(),
            "pay_r2".parse().unwrap(),
            id,
            50,
        );
        let record = PaymentRecord::success(&claim, 1999, Currency::Usd, Product::Business);
        store.insert_payment_record(&record).await.unwrap();

        let by_payment = store
            .get_successful_payment(&claim.payment_id)
            .await
            .unwrap()
            .unwrap();
        let by_order = store
            .get_successful_payment_for_order(&claim.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_payment, record);
        assert_eq!(by_order.id, record.id);
        assert!(matches!(
            store.insert_payment_record(&record).await,
            Err(StoreError::DuplicatePayment { .. })
        ));
    }
}
