//! Unit accounts: pending debts, carried credit, and reported payments.
use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::condo::{
    Debt, DebtId, DebtStatus, Event, EventType, Liquidation, LiquidationError, Money, PaymentId,
    Period, SettledDebt, UnitId, liquidate,
};

/// Metadata the ledger attaches to every debt it hands to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    pub period: Period,
}

/// Per-unit totals written to the balance report.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct UnitSummary<'a> {
    pub unit: &'a str,
    pub credit: Money,
    pub outstanding: Money,
    pub pending_debts: usize,
    pub settled_debts: usize,
    pub prepaid_periods: u64,
    pub awaiting_verification: usize,
}

/// One debt line of a unit's statement.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct DebtLine<'a> {
    pub unit: &'a str,
    pub debt: DebtId,
    pub period: Period,
    pub amount: Money,
    pub status: DebtStatus,
}

/// Represents the account of a condominium unit.
#[derive(Debug, Default)]
pub struct Unit {
    /// The unique identifier for the unit.
    unit_id: UnitId,

    /// Money paid in excess, available for future debts.
    credit: Money,

    /// Standard-fee periods already paid in advance.
    prepaid_periods: u64,

    /// Outstanding debts, ordered by period and then by debt ID.
    pending: Vec<Debt<Charge>>,

    /// Debts paid in full, in settlement order.
    settled: Vec<SettledDebt<Charge>>,

    /// Reported payments awaiting verification, already in the local currency.
    reported: HashMap<PaymentId, Money>,

    /// Payments that were approved or rejected.
    processed: HashSet<PaymentId>,

    /// Every debt ID ever charged to this unit.
    charged: HashSet<DebtId>,
}

impl Unit {
    /// Creates a new account for the given unit ID.
    pub fn new(unit_id: UnitId) -> Self {
        Unit {
            unit_id,
            ..Default::default()
        }
    }

    pub fn get_unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn get_credit(&self) -> Money {
        self.credit
    }

    pub fn get_prepaid_periods(&self) -> u64 {
        self.prepaid_periods
    }

    pub fn get_pending(&self) -> &[Debt<Charge>] {
        &self.pending
    }

    pub fn get_settled(&self) -> &[SettledDebt<Charge>] {
        &self.settled
    }

    /// Sum of all pending debts.
    pub fn outstanding(&self) -> Money {
        self.pending.iter().map(Debt::get_amount).sum()
    }

    /// Credit plus the value of prepaid periods, all of which a new
    /// liquidation may spend.
    fn carried_credit(&self, period_fee: Money) -> Result<Money, LedgerError> {
        period_fee
            .checked_times(self.prepaid_periods)
            .and_then(|prepaid| self.credit.checked_add(prepaid))
            .ok_or(LedgerError::AmountOutOfRange)
    }

    /// Stores a liquidation over `pending`, whose settled prefix is dropped.
    fn commit(&mut self, mut pending: Vec<Debt<Charge>>, liquidation: Liquidation<Charge>) {
        for settled in &liquidation.settled_debts {
            let debt = settled.get_debt();
            debug!(
                unit = %self.unit_id,
                debt = debt.get_id(),
                period = %debt.get_metadata().period,
                applied = %settled.get_applied(),
                "debt settled"
            );
        }
        self.pending = pending.split_off(liquidation.settled_debts.len());
        self.settled.extend(liquidation.settled_debts);
        self.credit = liquidation.remaining_credit;
        self.prepaid_periods = liquidation.prepaid_period_count;
    }

    /// Adds a debt for a period, then spends any carried credit on it.
    /// Zero-amount charges are liquidated right away, so they settle as soon
    /// as every older debt is paid.
    fn charge(
        &mut self,
        debt_id: DebtId,
        amount: Money,
        period: Period,
        period_fee: Money,
    ) -> Result<(), LedgerError> {
        if self.charged.contains(&debt_id) {
            return Err(LedgerError::DuplicateDebt(debt_id));
        }
        if amount.is_negative() {
            return Err(LedgerError::InvalidEvent("negative charge amount"));
        }
        // Keeps the outstanding total representable.
        self.outstanding()
            .checked_add(amount)
            .ok_or(LedgerError::AmountOutOfRange)?;

        let key = (period, debt_id);
        let position = self
            .pending
            .partition_point(|d| (d.get_metadata().period, d.get_id()) < key);
        let mut pending = self.pending.clone();
        pending.insert(position, Debt::new(debt_id, amount, Charge { period }));

        let carried = self.carried_credit(period_fee)?;
        if carried.is_zero() && !amount.is_zero() {
            self.pending = pending;
        } else {
            let liquidation = liquidate(Money::ZERO, carried, &pending, period_fee)?;
            info!(
                unit = %self.unit_id,
                debt = debt_id,
                carried = %carried,
                settled = liquidation.settled_debts.len(),
                "charge liquidated against carried credit"
            );
            self.commit(pending, liquidation);
        }
        self.charged.insert(debt_id);
        Ok(())
    }

    /// Holds a payment reported by the owner until it is verified.
    fn report(
        &mut self,
        payment_id: PaymentId,
        amount: Decimal,
        rate: Option<Decimal>,
    ) -> Result<(), LedgerError> {
        if self.processed.contains(&payment_id) || self.reported.contains_key(&payment_id) {
            return Err(LedgerError::DuplicatePayment(payment_id));
        }
        let amount = match rate {
            Some(rate) if rate <= Decimal::ZERO => {
                return Err(LedgerError::InvalidEvent("exchange rate must be positive"));
            }
            Some(rate) => Money::convert(amount, rate),
            None => Money::try_new(amount),
        }
        .ok_or(LedgerError::AmountOutOfRange)?;
        if amount.is_negative() {
            return Err(LedgerError::InvalidEvent("negative payment amount"));
        }
        debug!(unit = %self.unit_id, payment = payment_id, %amount, "payment reported");
        self.reported.insert(payment_id, amount);
        Ok(())
    }

    /// Liquidates a verified payment against the pending debts.
    fn approve(&mut self, payment_id: PaymentId, period_fee: Money) -> Result<(), LedgerError> {
        if self.processed.contains(&payment_id) {
            return Err(LedgerError::PaymentAlreadyProcessed(payment_id));
        }
        let amount = *self
            .reported
            .get(&payment_id)
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;

        let liquidation = liquidate(
            amount,
            self.carried_credit(period_fee)?,
            &self.pending,
            period_fee,
        )?;
        info!(
            unit = %self.unit_id,
            payment = payment_id,
            received = %liquidation.total_processed,
            applied = %liquidation.total_applied,
            settled = liquidation.settled_debts.len(),
            prepaid_periods = liquidation.prepaid_period_count,
            credit = %liquidation.remaining_credit,
            "payment liquidated"
        );

        self.reported.remove(&payment_id);
        self.processed.insert(payment_id);
        let pending = std::mem::take(&mut self.pending);
        self.commit(pending, liquidation);
        Ok(())
    }

    /// Discards a reported payment.
    fn reject(&mut self, payment_id: PaymentId) -> Result<(), LedgerError> {
        if self.processed.contains(&payment_id) {
            return Err(LedgerError::PaymentAlreadyProcessed(payment_id));
        }
        self.reported
            .remove(&payment_id)
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;
        self.processed.insert(payment_id);
        info!(unit = %self.unit_id, payment = payment_id, "payment rejected");
        Ok(())
    }

    /// Processes an event based on its type.
    /// Returns an error, leaving the unit unchanged, if the event is not for
    /// this unit or is invalid in the unit's current state.
    pub fn process_event(&mut self, event: Event, period_fee: Money) -> Result<(), LedgerError> {
        if event.get_unit_id() != self.unit_id {
            return Err(LedgerError::NotForThisUnit);
        }

        match event.get_type() {
            EventType::Charge => {
                let amount = event
                    .get_amount()
                    .ok_or(LedgerError::InvalidEvent("charge without amount"))?;
                let period = event
                    .get_period()
                    .ok_or(LedgerError::InvalidEvent("charge without period"))?;
                let amount = Money::try_new(amount).ok_or(LedgerError::AmountOutOfRange)?;
                self.charge(event.get_reference(), amount, period, period_fee)
            }
            EventType::Report => {
                let amount = event
                    .get_amount()
                    .ok_or(LedgerError::InvalidEvent("report without amount"))?;
                self.report(event.get_reference(), amount, event.get_rate())
            }
            EventType::Approve => self.approve(event.get_reference(), period_fee),
            EventType::Reject => self.reject(event.get_reference()),
        }
    }

    pub fn summary(&self) -> UnitSummary<'_> {
        UnitSummary {
            unit: &self.unit_id,
            credit: self.credit,
            outstanding: self.outstanding(),
            pending_debts: self.pending.len(),
            settled_debts: self.settled.len(),
            prepaid_periods: self.prepaid_periods,
            awaiting_verification: self.reported.len(),
        }
    }

    /// Every debt charged to the unit, ordered by period and debt ID.
    pub fn statement(&self) -> Vec<DebtLine<'_>> {
        let line = |debt: &Debt<Charge>, status| DebtLine {
            unit: &self.unit_id,
            debt: debt.get_id(),
            period: debt.get_metadata().period,
            amount: debt.get_amount(),
            status,
        };
        let mut lines: Vec<_> = self
            .settled
            .iter()
            .map(|s| line(s.get_debt(), DebtStatus::Settled))
            .chain(self.pending.iter().map(|d| line(d, DebtStatus::Pending)))
            .collect();
        lines.sort_by_key(|l| (l.period, l.debt));
        lines
    }
}

/// Errors that can occur while processing ledger events.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Event is not for this unit")]
    NotForThisUnit,
    #[error("Invalid event: {0}")]
    InvalidEvent(&'static str),
    #[error("Debt {0} was already charged")]
    DuplicateDebt(DebtId),
    #[error("Payment {0} was already reported")]
    DuplicatePayment(PaymentId),
    #[error("Payment {0} was never reported")]
    PaymentNotFound(PaymentId),
    #[error("Payment {0} was already approved or rejected")]
    PaymentAlreadyProcessed(PaymentId),
    #[error("Amount out of range")]
    AmountOutOfRange,
    #[error(transparent)]
    Liquidation(#[from] LiquidationError),
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::condo::{Event, EventType, LedgerError, Money, Unit};

    const FEE: Money = Money::ZERO;

    fn fee() -> Money {
        Money::new(dec!(25.00))
    }

    fn pending_ids(unit: &Unit) -> Vec<u32> {
        unit.get_pending().iter().map(|d| d.get_id()).collect()
    }

    fn pay(unit: &mut Unit, payment_id: u32, amount: rust_decimal::Decimal, period_fee: Money) {
        unit.process_event(Event::report("A-101", payment_id, amount, None), period_fee)
            .unwrap();
        unit.process_event(
            Event::verdict(EventType::Approve, "A-101", payment_id),
            period_fee,
        )
        .unwrap();
    }

    #[test]
    fn test_wrong_unit() {
        let mut unit = Unit::new("A-101".into());
        let event = Event::charge("B-202", 1, dec!(25.00), "2024-01");
        assert!(matches!(
            unit.process_event(event, FEE),
            Err(LedgerError::NotForThisUnit)
        ));
    }

    #[test]
    fn test_charge_keeps_oldest_first() {
        let mut unit = Unit::new("A-101".into());
        for event in [
            Event::charge("A-101", 3, dec!(25.00), "2024-03"),
            Event::charge("A-101", 1, dec!(25.00), "2024-01"),
            Event::charge("A-101", 2, dec!(25.00), "2024-02"),
        ] {
            unit.process_event(event, FEE).unwrap();
        }
        assert_eq!(pending_ids(&unit), vec![1, 2, 3]);
        assert_eq!(unit.outstanding(), Money::new(dec!(75.00)));
    }

    #[test]
    fn test_duplicate_charge() {
        let mut unit = Unit::new("A-101".into());
        let event = Event::charge("A-101", 1, dec!(25.00), "2024-01");
        assert!(unit.process_event(event.clone(), FEE).is_ok());
        assert!(matches!(
            unit.process_event(event, FEE),
            Err(LedgerError::DuplicateDebt(1))
        ));
    }

    #[test]
    fn test_approve_settles_oldest_first() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 2, dec!(20.00), "2024-02"), FEE)
            .unwrap();
        unit.process_event(Event::charge("A-101", 1, dec!(10.00), "2024-01"), FEE)
            .unwrap();
        unit.process_event(Event::charge("A-101", 3, dec!(5.00), "2024-03"), FEE)
            .unwrap();
        pay(&mut unit, 10, dec!(15.00), FEE);

        assert_eq!(pending_ids(&unit), vec![2, 3]);
        assert_eq!(unit.get_settled().len(), 1);
        assert_eq!(unit.get_credit(), Money::new(dec!(5.00)));
    }

    #[test]
    fn test_surplus_prepays_periods() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 1, dec!(25.00), "2024-01"), fee())
            .unwrap();
        pay(&mut unit, 10, dec!(87.50), fee());

        assert!(unit.get_pending().is_empty());
        assert_eq!(unit.get_prepaid_periods(), 2);
        assert_eq!(unit.get_credit(), Money::new(dec!(12.50)));
    }

    #[test]
    fn test_charge_consumes_carried_credit() {
        let mut unit = Unit::new("A-101".into());
        pay(&mut unit, 10, dec!(62.50), fee());
        assert_eq!(unit.get_prepaid_periods(), 2);

        unit.process_event(Event::charge("A-101", 1, dec!(25.00), "2024-01"), fee())
            .unwrap();
        assert!(unit.get_pending().is_empty());
        assert_eq!(unit.get_prepaid_periods(), 1);
        assert_eq!(unit.get_credit(), Money::new(dec!(12.50)));

        unit.process_event(Event::charge("A-101", 2, dec!(40.00), "2024-02"), fee())
            .unwrap();
        assert_eq!(pending_ids(&unit), vec![2]);
        assert_eq!(unit.get_prepaid_periods(), 1);
        assert_eq!(unit.get_credit(), Money::new(dec!(12.50)));
    }

    #[test]
    fn test_foreign_currency_report() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 1, dec!(365.00), "2024-01"), FEE)
            .unwrap();
        unit.process_event(Event::report("A-101", 10, dec!(10), Some(dec!(36.5725))), FEE)
            .unwrap();
        assert_eq!(unit.summary().awaiting_verification, 1);
        unit.process_event(Event::verdict(EventType::Approve, "A-101", 10), FEE)
            .unwrap();
        assert!(unit.get_pending().is_empty());
        assert_eq!(unit.get_credit(), Money::new(dec!(0.73)));
    }

    #[test]
    fn test_invalid_rate() {
        let mut unit = Unit::new("A-101".into());
        let event = Event::report("A-101", 10, dec!(10), Some(dec!(0)));
        assert!(matches!(
            unit.process_event(event, FEE),
            Err(LedgerError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_reject() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 1, dec!(25.00), "2024-01"), FEE)
            .unwrap();
        unit.process_event(Event::report("A-101", 10, dec!(25.00), None), FEE)
            .unwrap();
        unit.process_event(Event::verdict(EventType::Reject, "A-101", 10), FEE)
            .unwrap();
        assert_eq!(pending_ids(&unit), vec![1]);
        assert_eq!(unit.get_credit(), Money::ZERO);
        assert!(matches!(
            unit.process_event(Event::verdict(EventType::Approve, "A-101", 10), FEE),
            Err(LedgerError::PaymentAlreadyProcessed(10))
        ));
    }

    #[test]
    fn test_approve_unknown_payment() {
        let mut unit = Unit::new("A-101".into());
        assert!(matches!(
            unit.process_event(Event::verdict(EventType::Approve, "A-101", 99), FEE),
            Err(LedgerError::PaymentNotFound(99))
        ));
    }

    #[test]
    fn test_double_approve_and_duplicate_report() {
        let mut unit = Unit::new("A-101".into());
        pay(&mut unit, 10, dec!(5.00), FEE);
        assert!(matches!(
            unit.process_event(Event::verdict(EventType::Approve, "A-101", 10), FEE),
            Err(LedgerError::PaymentAlreadyProcessed(10))
        ));
        assert!(matches!(
            unit.process_event(Event::report("A-101", 10, dec!(5.00), None), FEE),
            Err(LedgerError::DuplicatePayment(10))
        ));
        assert_eq!(unit.get_credit(), Money::new(dec!(5.00)));
    }

    #[test]
    fn test_negative_amounts() {
        let mut unit = Unit::new("A-101".into());
        assert!(matches!(
            unit.process_event(Event::charge("A-101", 1, dec!(-1.00), "2024-01"), FEE),
            Err(LedgerError::InvalidEvent(_))
        ));
        assert!(matches!(
            unit.process_event(Event::report("A-101", 10, dec!(-1.00), None), FEE),
            Err(LedgerError::InvalidEvent(_))
        ));
        assert!(unit.get_pending().is_empty());
    }

    #[test]
    fn test_out_of_range_report() {
        let mut unit = Unit::new("A-101".into());
        let huge = dec!(10000000000000000000000000000);
        assert!(matches!(
            unit.process_event(Event::report("A-101", 10, huge, Some(dec!(100))), FEE),
            Err(LedgerError::AmountOutOfRange)
        ));
        assert!(matches!(
            unit.process_event(
                Event::report("A-101", 11, dec!(1000000000000000000000000000), None),
                FEE
            ),
            Err(LedgerError::AmountOutOfRange)
        ));
        assert_eq!(unit.summary().awaiting_verification, 0);
    }

    #[test]
    fn test_approve_overflowing_credit() {
        let mut unit = Unit::new("A-101".into());
        let half = dec!(500000000000000000000000000.00);
        pay(&mut unit, 1, half, FEE);
        unit.process_event(Event::report("A-101", 2, half, None), FEE)
            .unwrap();
        assert!(matches!(
            unit.process_event(Event::verdict(EventType::Approve, "A-101", 2), FEE),
            Err(LedgerError::Liquidation(
                crate::condo::LiquidationError::AmountOverflow { .. }
            ))
        ));
        assert_eq!(unit.get_credit(), Money::new(half));
        assert_eq!(unit.summary().awaiting_verification, 1);
    }

    #[test]
    fn test_out_of_range_outstanding() {
        let mut unit = Unit::new("A-101".into());
        let half = dec!(500000000000000000000000000.00);
        unit.process_event(Event::charge("A-101", 1, half, "2024-01"), FEE)
            .unwrap();
        assert!(matches!(
            unit.process_event(Event::charge("A-101", 2, half, "2024-02"), FEE),
            Err(LedgerError::AmountOutOfRange)
        ));
        assert_eq!(pending_ids(&unit), vec![1]);
    }

    #[test]
    fn test_zero_charge_settles_immediately() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 1, dec!(0.00), "2024-01"), fee())
            .unwrap();
        assert!(unit.get_pending().is_empty());
        assert_eq!(unit.get_settled().len(), 1);

        // Behind an unpaid older debt it waits its turn.
        unit.process_event(Event::charge("A-101", 2, dec!(25.00), "2024-02"), fee())
            .unwrap();
        unit.process_event(Event::charge("A-101", 3, dec!(0.00), "2024-03"), fee())
            .unwrap();
        assert_eq!(pending_ids(&unit), vec![2, 3]);
        pay(&mut unit, 10, dec!(25.00), fee());
        assert!(unit.get_pending().is_empty());
        assert_eq!(unit.get_prepaid_periods(), 0);
    }

    #[test]
    fn test_statement() {
        let mut unit = Unit::new("A-101".into());
        unit.process_event(Event::charge("A-101", 2, dec!(25.00), "2024-02"), FEE)
            .unwrap();
        unit.process_event(Event::charge("A-101", 1, dec!(25.00), "2024-01"), FEE)
            .unwrap();
        pay(&mut unit, 10, dec!(30.00), FEE);

        let lines = unit.statement();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].debt, 1);
        assert_eq!(lines[0].status, crate::condo::DebtStatus::Settled);
        assert_eq!(lines[1].debt, 2);
        assert_eq!(lines[1].status, crate::condo::DebtStatus::Pending);
    }
}
