//! Ledger events: debt charges and the payment report / verification workflow.
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::condo::{Period, UnitId, money::deserialize_decimal, types::deserialize_period};

/// Enum representing the type of ledger event.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A debt is charged to the unit for a billing period.
    Charge,
    /// An owner reports a payment, awaiting verification.
    Report,
    /// An administrator verifies a reported payment.
    Approve,
    /// An administrator rejects a reported payment.
    Reject,
}

/// Represents a ledger event read from the input CSV.
#[derive(Deserialize, Debug, Clone)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,

    /// The unit this event applies to.
    #[serde(rename = "unit")]
    unit_id: UnitId,

    /// The debt ID for charges, the payment ID otherwise.
    #[serde(rename = "ref")]
    reference: u32,

    /// Charged or reported amount. Stated in foreign currency when `rate` is set.
    #[serde(default, deserialize_with = "deserialize_decimal")]
    amount: Option<Decimal>,

    /// Billing period of a charge.
    #[serde(default, deserialize_with = "deserialize_period")]
    period: Option<Period>,

    /// Exchange rate to the local currency for a reported payment.
    #[serde(default, deserialize_with = "deserialize_decimal")]
    rate: Option<Decimal>,
}

impl Event {
    pub fn get_type(&self) -> EventType {
        self.event_type
    }

    pub fn get_unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn get_reference(&self) -> u32 {
        self.reference
    }

    pub fn get_amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn get_period(&self) -> Option<Period> {
        self.period
    }

    pub fn get_rate(&self) -> Option<Decimal> {
        self.rate
    }

    #[cfg(test)]
    pub fn charge(unit_id: &str, debt_id: u32, amount: Decimal, period: &str) -> Self {
        Event {
            event_type: EventType::Charge,
            unit_id: unit_id.to_owned(),
            reference: debt_id,
            amount: Some(amount),
            period: period.parse().ok(),
            rate: None,
        }
    }

    #[cfg(test)]
    pub fn report(unit_id: &str, payment_id: u32, amount: Decimal, rate: Option<Decimal>) -> Self {
        Event {
            event_type: EventType::Report,
            unit_id: unit_id.to_owned(),
            reference: payment_id,
            amount: Some(amount),
            period: None,
            rate,
        }
    }

    #[cfg(test)]
    pub fn verdict(event_type: EventType, unit_id: &str, payment_id: u32) -> Self {
        Event {
            event_type,
            unit_id: unit_id.to_owned(),
            reference: payment_id,
            amount: None,
            period: None,
            rate: None,
        }
    }
}
