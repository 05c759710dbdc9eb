//! Key encoding utilities for `RocksDB`.

use infograph_core::{AccountId, OrderId, PaymentId, PaymentRecordId};

/// Create an account key.
#[must_use]
pub fn account_key(id: &AccountId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Create a payment record key.
#[must_use]
pub fn record_key(id: &PaymentRecordId) -> Vec<u8> {
    id.to_bytes().to_vec()
}

/// Create an account-record index key.
///
/// Format: `account_id (16 bytes) || record_id (16 bytes)`
///
/// Since ULIDs are time-ordered, an account's records sort by time.
#[must_use]
pub fn account_record_key(account_id: &AccountId, record_id: &PaymentRecordId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&record_id.to_bytes());
    key
}

/// Create a prefix for iterating all records of an account.
#[must_use]
pub fn account_records_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Extract the record ID from an account-record index key.
///
/// Returns `None` if the key is not exactly 32 bytes.
#[must_use]
pub fn record_id_from_account_key(key: &[u8]) -> Option<PaymentRecordId> {
    let bytes: [u8; 16] = key.get(16..32)?.try_into().ok()?;
    (key.len() == 32).then(|| PaymentRecordId::from_bytes(bytes))
}

/// Create a payment key.
#[must_use]
pub fn payment_key(id: &PaymentId) -> Vec<u8> {
    id.as_str().as_bytes().to_vec()
}

/// Create an order key.
#[must_use]
pub fn order_key(id: &OrderId) -> Vec<u8> {
    id.as_str().as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_record_key_format() {
        let account_id = AccountId::generate();
        let record_id = PaymentRecordId::generate();
        let key = account_record_key(&account_id, &record_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], account_id.as_bytes());
        assert_eq!(record_id_from_account_key(&key), Some(record_id));
    }

    #[test]
    fn short_index_key_is_rejected() {
        assert_eq!(record_id_from_account_key(&[0u8; 20]), None);
    }
}
