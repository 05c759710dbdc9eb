//! API handlers.

pub mod accounts;
pub mod credits;
pub mod health;
pub mod orders;
pub mod payments;
