//! Ledger behaviour shared by every backend.
//!
//! The in-memory backend always runs. PostgreSQL runs with
//! `cargo test -- --ignored` when `DATABASE_URL` points at a scratch database.

use std::sync::Arc;

use infograph_core::{AccountId, Currency, PaymentClaim, PaymentRecord, Product};
use infograph_store::{MemoryStore, PgStore, Settlement, Store, StoreError};

fn claim(order: &str, payment: &str, account_id: AccountId, credits: i64) -> PaymentClaim {
    PaymentClaim::new(order.parse().unwrap(), payment.parse().unwrap(), account_id, credits)
}

/// Unique provider ids so repeated runs against a real database don't collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", AccountId::generate().as_uuid().simple())
}

async fn funded_account(store: &dyn Store, credits: i64) -> AccountId {
    let id = AccountId::generate();
    store.create_account(&id).await.unwrap();
    if credits > 0 {
        let settlement = store
            .settle_payment(&claim(&unique("order"), &unique("pay"), id, credits))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Credited { balance: credits });
    }
    id
}

async fn debit_never_goes_negative(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 0).await;

    let err = store.debit_credit(&id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientCredits {
            balance: 0,
            required: 1
        }
    ));
    assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 0);
}

async fn ten_debits_then_insufficient(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 10).await;

    for expected in (0..10).rev() {
        assert_eq!(store.debit_credit(&id).await.unwrap(), expected);
    }
    assert!(matches!(
        store.debit_credit(&id).await,
        Err(StoreError::InsufficientCredits { .. })
    ));
    assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 0);
}

async fn concurrent_debits_spend_one_credit_once(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 1).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.debit_credit(&id).await })
        })
        .collect();

    let mut successes = 0;
    let mut insufficient = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(remaining) => {
                assert_eq!(remaining, 0);
                successes += 1;
            }
            Err(StoreError::InsufficientCredits { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(insufficient, 7);
    assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 0);
}

async fn debit_unknown_account(store: Arc<dyn Store>) {
    let err = store.debit_credit(&AccountId::generate()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

async fn payment_settles_once(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 0).await;
    let order = unique("order");
    let payment = unique("pay");

    let first = store.settle_payment(&claim(&order, &payment, id, 10)).await.unwrap();
    assert_eq!(first, Settlement::Credited { balance: 10 });

    let second = store.settle_payment(&claim(&order, &payment, id, 10)).await.unwrap();
    assert_eq!(second, Settlement::PaymentAlreadySettled { account_id: id });

    let replay = store
        .settle_payment(&claim(&order, &unique("pay"), id, 10))
        .await
        .unwrap();
    assert_eq!(
        replay,
        Settlement::OrderAlreadySettled {
            payment_id: payment.parse().unwrap()
        }
    );

    assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 10);
}

async fn concurrent_settlements_credit_once(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 0).await;
    let order = unique("order");
    let payment = unique("pay");

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let store = Arc::clone(&store);
            let claim = claim(&order, &payment, id, 10);
            tokio::spawn(async move { store.settle_payment(&claim).await })
        })
        .collect();

    let mut credited = 0;
    for task in tasks {
        if let Settlement::Credited { .. } = task.await.unwrap().unwrap() {
            credited += 1;
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(store.get_account(&id).await.unwrap().unwrap().credits, 10);
}

async fn records_list_newest_first(store: Arc<dyn Store>) {
    let id = funded_account(store.as_ref(), 0).await;

    let failed = PaymentRecord::signature_failed(
        unique("order").parse().unwrap(),
        unique("pay").parse().unwrap(),
        Some(id),
    );
    store.insert_payment_record(&failed).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let settled = claim(&unique("order"), &unique("pay"), id, 10);
    let success = PaymentRecord::success(&settled, 499, Currency::Usd, Product::ProPack);
    store.insert_payment_record(&success).await.unwrap();

    let listed = store.list_payments_by_account(&id, 10, 0).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, success.id);
    assert_eq!(listed[1].id, failed.id);

    let paged = store.list_payments_by_account(&id, 1, 1).await.unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].id, failed.id);

    let found = store
        .get_successful_payment(&settled.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.credits_granted, 10);
    assert!(store
        .get_successful_payment(&failed.payment_id)
        .await
        .unwrap()
        .is_none());
}

async fn run_all(store: Arc<dyn Store>) {
    debit_never_goes_negative(Arc::clone(&store)).await;
    ten_debits_then_insufficient(Arc::clone(&store)).await;
    concurrent_debits_spend_one_credit_once(Arc::clone(&store)).await;
    debit_unknown_account(Arc::clone(&store)).await;
    payment_settles_once(Arc::clone(&store)).await;
    concurrent_settlements_credit_once(Arc::clone(&store)).await;
    records_list_newest_first(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_store_ledger() {
    run_all(Arc::new(MemoryStore::new())).await;
}

#[cfg(feature = "rocksdb-backend")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rocks_store_ledger() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = infograph_store::RocksStore::open(dir.path()).unwrap();
    run_all(Arc::new(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at a PostgreSQL instance"]
async fn postgres_store_ledger() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url).await.unwrap();
    run_all(Arc::new(store)).await;
}
