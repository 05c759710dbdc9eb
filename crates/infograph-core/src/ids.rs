//! Identifier types for infograph.
//!
//! Accounts are keyed by UUIDs issued by the identity provider, payment records
//! by time-ordered ULIDs, and provider-side orders and payments by the opaque
//! strings the payment provider hands out.
//!
//! # Macro-based provider IDs
//!
//! The `provider_id_type!` macro generates the string newtypes used for
//! payment-provider identifiers so that `OrderId` and `PaymentId` share one
//! validation rule and one set of trait implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Maximum accepted length of a provider identifier.
pub const MAX_PROVIDER_ID_LEN: usize = 64;

/// An account identifier (UUID format from the identity provider).
///
/// Account IDs are extracted from the JWT `sub` claim and are stable across
/// sessions once a user has authenticated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(uuid::Uuid);

impl AccountId {
    /// Create a new identifier from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random identifier (primarily for testing).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Return the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Return the bytes of the UUID (16 bytes).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl FromStr for AccountId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
        Ok(Self(uuid))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0.to_string()
    }
}

/// A payment record identifier using ULID for time-ordering.
///
/// Records written later sort after records written earlier, which gives the
/// per-account payment history its natural newest-first order when iterated
/// in reverse.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentRecordId(Ulid);

impl PaymentRecordId {
    /// Generate a new `PaymentRecordId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `PaymentRecordId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for PaymentRecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for PaymentRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentRecordId({})", self.0)
    }
}

impl fmt::Display for PaymentRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PaymentRecordId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentRecordId> for String {
    fn from(id: PaymentRecordId) -> Self {
        id.0.to_string()
    }
}

/// Defines a validated string identifier issued by the payment provider.
///
/// Accepted identifiers are non-empty, at most [`MAX_PROVIDER_ID_LEN`] bytes,
/// and restricted to ASCII alphanumerics, `_` and `-`. The restriction keeps
/// the `order_id|payment_id` signature message unambiguous.
macro_rules! provider_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let valid = !s.is_empty()
                    && s.len() <= MAX_PROVIDER_ID_LEN
                    && s
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
                if valid {
                    Ok(Self(s.to_string()))
                } else {
                    Err(IdError::InvalidProviderId(stringify!($name)))
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

provider_id_type!(OrderId, "A payment-provider order identifier (e.g. `order_Nx3k...`).\n\nOne order yields at most one successful payment.");
provider_id_type!(PaymentId, "A payment-provider payment identifier (e.g. `pay_Nx3k...`).\n\nGlobally unique per payment attempt.");

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The input is not a valid provider identifier.
    #[error("invalid {0}")]
    InvalidProviderId(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_parses_uuid() {
        let id = AccountId::generate();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!("not-a-uuid".parse::<AccountId>(), Err(IdError::InvalidUuid));
    }

    #[test]
    fn account_id_serializes_as_string() {
        let id = AccountId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn record_ids_are_time_ordered() {
        let first = PaymentRecordId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = PaymentRecordId::generate();
        assert!(first < second);
        assert_eq!(PaymentRecordId::from_bytes(first.to_bytes()), first);
    }

    #[test]
    fn provider_ids_accept_razorpay_style_values() {
        assert!("order_DBJOWzybf0sJbb".parse::<OrderId>().is_ok());
        assert!("pay_29QQoUBi66xm2f".parse::<PaymentId>().is_ok());
    }

    #[test]
    fn provider_ids_reject_separator_and_blank_values() {
        assert_eq!(
            "order_1|pay_2".parse::<OrderId>(),
            Err(IdError::InvalidProviderId("OrderId"))
        );
        assert!("".parse::<PaymentId>().is_err());
        assert!(" pay_1".parse::<PaymentId>().is_err());
        assert!("x".repeat(MAX_PROVIDER_ID_LEN + 1).parse::<OrderId>().is_err());
    }

    #[test]
    fn provider_id_deserialization_validates() {
        let ok: Result<PaymentId, _> = serde_json::from_str("\"pay_abc\"");
        assert!(ok.is_ok());
        let bad: Result<PaymentId, _> = serde_json::from_str("\"pay abc\"");
        assert!(bad.is_err());
    }
}
