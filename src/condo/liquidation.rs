//! Payment liquidation: allocating a received payment plus carried credit
//! against outstanding debts and prepaid periods.
use thiserror::Error;

use crate::condo::{Debt, Money, SettledDebt};

/// Outcome of a single liquidation.
///
/// `total_processed + prior_credit == total_applied + remaining_credit`
/// holds exactly for every successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liquidation<M> {
    /// The received amount, echoed back.
    pub total_processed: Money,
    /// Money allocated to settled debts and prepaid periods.
    pub total_applied: Money,
    /// Debts paid in full, in input order. Always a prefix of the input.
    pub settled_debts: Vec<SettledDebt<M>>,
    /// Standard-fee periods paid in advance after the settled debts.
    pub prepaid_period_count: u64,
    /// Money left over, the new credit balance.
    pub remaining_credit: Money,
}

impl<M> Liquidation<M> {
    /// Money spent on prepaid periods.
    pub fn prepaid_amount(&self) -> Money {
        self.total_applied - self.settled_debts.iter().map(SettledDebt::get_applied).sum::<Money>()
    }
}

/// Errors raised before any allocation work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiquidationError {
    #[error("Invalid amount for {field}: {amount}")]
    InvalidAmount { field: String, amount: Money },
    #[error("Received {received} plus credit {prior_credit} exceeds the largest amount")]
    AmountOverflow { received: Money, prior_credit: Money },
    #[error("Prepaid period count overflows for {available} at {period_fee} per period")]
    PrepaymentOverflow { available: Money, period_fee: Money },
}

fn ensure_non_negative(field: impl Into<String>, amount: Money) -> Result<(), LiquidationError> {
    if amount.is_negative() {
        Err(LiquidationError::InvalidAmount {
            field: field.into(),
            amount,
        })
    } else {
        Ok(())
    }
}

/// Allocates `received + prior_credit` against `pending_debts`, then prepays
/// whole periods of `period_fee` with the surplus.
///
/// Debts must be ordered oldest first; the order is trusted. Debts are only
/// settled in full, and settlement stops at the first debt the available
/// funds cannot cover, even if a later one would fit. A zero `period_fee`
/// disables prepayment.
pub fn liquidate<M: Clone>(
    received: Money,
    prior_credit: Money,
    pending_debts: &[Debt<M>],
    period_fee: Money,
) -> Result<Liquidation<M>, LiquidationError> {
    ensure_non_negative("received amount", received)?;
    ensure_non_negative("prior credit", prior_credit)?;
    ensure_non_negative("period fee", period_fee)?;
    for debt in pending_debts {
        ensure_non_negative(format!("debt {}", debt.get_id()), debt.get_amount())?;
    }

    let mut available = received
        .checked_add(prior_credit)
        .ok_or(LiquidationError::AmountOverflow {
            received,
            prior_credit,
        })?;
    let mut total_applied = Money::ZERO;

    let mut settled_debts = Vec::new();
    for debt in pending_debts {
        if available < debt.get_amount() {
            break;
        }
        available -= debt.get_amount();
        total_applied += debt.get_amount();
        settled_debts.push(SettledDebt::settle(debt.clone()));
    }

    let mut prepaid_period_count = 0;
    if period_fee > Money::ZERO {
        let overflow = LiquidationError::PrepaymentOverflow {
            available,
            period_fee,
        };
        prepaid_period_count = available
            .whole_multiples_of(period_fee)
            .ok_or(overflow.clone())?;
        let prepaid = period_fee
            .checked_times(prepaid_period_count)
            .ok_or(overflow)?;
        available -= prepaid;
        total_applied += prepaid;
    }

    Ok(Liquidation {
        total_processed: received,
        total_applied,
        settled_debts,
        prepaid_period_count,
        remaining_credit: available,
    })
}
