//! Credit-affecting operations.
//!
//! Handlers stay thin: they parse and authenticate, then call into these
//! modules. Only [`debit`] and [`verification`] write to the ledger or the
//! payment record store.

pub mod debit;
pub mod orders;
pub mod verification;

pub use debit::debit_credit;
pub use orders::{create_order, CreatedOrder, OrderRequest};
pub use verification::{verify_payment, PaymentConfirmation, VerificationOutcome};
