//! Condominium ledger: money, debts, payment liquidation, and unit accounts.
mod debt;
mod event;
mod ledger;
mod liquidation;
mod money;
mod types;
mod unit;

pub use debt::*;
pub use event::*;
pub use ledger::*;
pub use liquidation::*;
pub use money::Money;
pub use types::*;
pub use unit::*;
