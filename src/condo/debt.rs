//! Debt entries handed to, and returned by, the liquidation engine.
use serde::Serialize;

use crate::condo::{DebtId, Money};

/// Settlement status of a debt.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Pending,
    Settled,
}

/// An outstanding debt with caller-defined metadata.
///
/// The engine reads only `id` and `amount`; `metadata` is carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debt<M> {
    id: DebtId,
    amount: Money,
    metadata: M,
}

impl<M> Debt<M> {
    pub fn new(id: DebtId, amount: Money, metadata: M) -> Self {
        Debt {
            id,
            amount,
            metadata,
        }
    }

    /// Gets the debt ID.
    pub fn get_id(&self) -> DebtId {
        self.id
    }

    /// Gets the amount owed.
    pub fn get_amount(&self) -> Money {
        self.amount
    }

    /// Gets the caller metadata.
    pub fn get_metadata(&self) -> &M {
        &self.metadata
    }
}

/// A debt paid in full by a liquidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledDebt<M> {
    debt: Debt<M>,
    applied: Money,
}

impl<M> SettledDebt<M> {
    /// Marks a debt as paid in full.
    pub(crate) fn settle(debt: Debt<M>) -> Self {
        SettledDebt {
            applied: debt.amount,
            debt,
        }
    }

    pub fn get_debt(&self) -> &Debt<M> {
        &self.debt
    }

    pub fn into_debt(self) -> Debt<M> {
        self.debt
    }

    /// Gets the amount applied, always the full debt amount.
    pub fn get_applied(&self) -> Money {
        self.applied
    }

    pub fn get_status(&self) -> DebtStatus {
        DebtStatus::Settled
    }
}
