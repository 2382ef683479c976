//! Payment liquidation for condominium ledgers.
//!
//! [`liquidate`] allocates a received payment plus carried credit to pending
//! debts, oldest first, and prepays whole billing periods with the surplus.
//! [`Ledger`] drives it from a stream of charge, report, and verification
//! events.
mod condo;

pub use condo::*;
