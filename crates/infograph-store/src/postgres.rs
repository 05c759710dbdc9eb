//! PostgreSQL storage implementation.
//!
//! The debit is a single conditional `UPDATE ... WHERE credits > 0`. The
//! settlement locks the account row, inserts the claim with
//! `ON CONFLICT DO NOTHING` and increments the balance inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use infograph_core::{Account, AccountId, OrderId, PaymentClaim, PaymentId, PaymentRecord};

use crate::error::{Result, StoreError};
use crate::{Settlement, Store};

/// Maximum pooled connections.
const MAX_CONNECTIONS: u32 = 10;

/// Partial unique index on `payment_id` for success rows.
const SUCCESS_PAYMENT_INDEX: &str = "payment_records_success_payment_idx";

/// Partial unique index on `order_id` for success rows.
const SUCCESS_ORDER_INDEX: &str = "payment_records_success_order_idx";

const RECORD_COLUMNS: &str = "id, order_id, payment_id, account_id, amount, currency, product, \
                              credits_granted, status, created_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("PostgreSQL migrations applied");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    credits: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from_uuid(row.id),
            credits: row.credits,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PaymentRecordRow {
    id: String,
    order_id: String,
    payment_id: String,
    account_id: Option<Uuid>,
    amount: i64,
    currency: Option<String>,
    product: Option<String>,
    credits_granted: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRecordRow> for PaymentRecord {
    type Error = StoreError;

    fn try_from(row: PaymentRecordRow) -> Result<Self> {
        let corrupt = |e: String| StoreError::Serialization(format!("payment record {}: {e}", row.id));

        Ok(Self {
            id: row.id.parse().map_err(|e| corrupt(format!("{e}")))?,
            order_id: row.order_id.parse().map_err(|e| corrupt(format!("{e}")))?,
            payment_id: row.payment_id.parse().map_err(|e| corrupt(format!("{e}")))?,
            account_id: row.account_id.map(AccountId::from_uuid),
            amount: row.amount,
            currency: row
                .currency
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| corrupt(format!("{e}")))?,
            product: row
                .product
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| corrupt(format!("{e}")))?,
            credits_granted: row.credits_granted,
            status: row.status.parse().map_err(corrupt)?,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, credits, created_at, updated_at FROM accounts WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn create_account(&self, id: &AccountId) -> Result<Account> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO accounts (id) VALUES ($1)
             ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
             RETURNING id, credits, created_at, updated_at",
        )
        .bind(*id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn debit_credit(&self, id: &AccountId) -> Result<i64> {
        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE accounts SET credits = credits - 1, updated_at = now()
             WHERE id = $1 AND credits > 0
             RETURNING credits",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(remaining);
        }

        // Nothing was updated: report why. No write happens on this path.
        let balance: Option<i64> = sqlx::query_scalar("SELECT credits FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match balance {
            Some(balance) => Err(StoreError::InsufficientCredits {
                balance,
                required: 1,
            }),
            None => Err(StoreError::account_not_found(id)),
        }
    }

    async fn settle_payment(&self, claim: &PaymentClaim) -> Result<Settlement> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT credits FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(*claim.account_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::account_not_found(&claim.account_id));
        }

        let inserted: Option<String> = sqlx::query_scalar(
            "INSERT INTO payment_claims (payment_id, order_id, account_id, credits, claimed_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING
             RETURNING payment_id",
        )
        .bind(claim.payment_id.as_str())
        .bind(claim.order_id.as_str())
        .bind(*claim.account_id.as_uuid())
        .bind(claim.credits)
        .bind(claim.claimed_at)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            let by_payment: Option<Uuid> =
                sqlx::query_scalar("SELECT account_id FROM payment_claims WHERE payment_id = $1")
                    .bind(claim.payment_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(account_id) = by_payment {
                return Ok(Settlement::PaymentAlreadySettled {
                    account_id: AccountId::from_uuid(account_id),
                });
            }

            let by_order: String =
                sqlx::query_scalar("SELECT payment_id FROM payment_claims WHERE order_id = $1")
                    .bind(claim.order_id.as_str())
                    .fetch_one(&mut *tx)
                    .await?;
            let payment_id = by_order
                .parse::<PaymentId>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            return Ok(Settlement::OrderAlreadySettled { payment_id });
        }

        let balance: i64 = sqlx::query_scalar(
            "UPDATE accounts SET credits = credits + $2, updated_at = now()
             WHERE id = $1
             RETURNING credits",
        )
        .bind(*claim.account_id.as_uuid())
        .bind(claim.credits)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Settlement::Credited { balance })
    }

    async fn insert_payment_record(&self, record: &PaymentRecord) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO payment_records
                 (id, order_id, payment_id, account_id, amount, currency, product,
                  credits_granted, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id.to_string())
        .bind(record.order_id.as_str())
        .bind(record.payment_id.as_str())
        .bind(record.account_id.map(|id| *id.as_uuid()))
        .bind(record.amount)
        .bind(record.currency.map(|c| c.code()))
        .bind(record.product.map(|p| p.as_str()))
        .bind(record.credits_granted)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                match db.constraint() {
                    Some(SUCCESS_ORDER_INDEX) => Err(StoreError::OrderAlreadySettled {
                        order_id: record.order_id.to_string(),
                    }),
                    Some(SUCCESS_PAYMENT_INDEX) => Err(StoreError::DuplicatePayment {
                        payment_id: record.payment_id.to_string(),
                    }),
                    _ => Err(StoreError::Database(db.to_string())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_successful_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM payment_records
             WHERE payment_id = $1 AND status = 'success'"
        ))
        .bind(payment_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(PaymentRecord::try_from)
        .transpose()
    }

    async fn get_successful_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM payment_records
             WHERE order_id = $1 AND status = 'success'"
        ))
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(PaymentRecord::try_from)
        .transpose()
    }

    async fn list_payments_by_account(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PaymentRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        sqlx::query_as::<_, PaymentRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM payment_records
             WHERE account_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(*id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(PaymentRecord::try_from)
        .collect()
    }
}
