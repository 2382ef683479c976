//! The `Ledger` module owns every unit account and applies events to them in order.
use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::condo::{Event, LedgerError, Money, Unit, UnitId};

/// Represents the condominium ledger, including all unit accounts.
///
/// A single task drains the channel, so each liquidation reads and writes
/// back a unit's debts and credit without interleaving with other events.
pub struct Ledger {
    /// Unit accounts, ordered by unit ID.
    units: BTreeMap<UnitId, Unit>,
    /// Cost of one standard billing period, used for prepayments.
    period_fee: Money,
    /// A channel receiver for incoming events.
    receiver: mpsc::Receiver<Event>,
}

impl Ledger {
    /// Creates a new, empty ledger charging `period_fee` per prepaid period.
    pub fn new(receiver: mpsc::Receiver<Event>, period_fee: Money) -> Self {
        Ledger {
            units: BTreeMap::new(),
            period_fee,
            receiver,
        }
    }

    /// Retrieves a unit by ID, or creates a new one if it doesn't exist.
    pub fn get_or_create_unit(&mut self, unit_id: &str) -> &mut Unit {
        self.units
            .entry(unit_id.to_owned())
            .or_insert_with(|| Unit::new(unit_id.to_owned()))
    }

    /// Retrieves all units in the ledger.
    pub fn get_all_units(&self) -> &BTreeMap<UnitId, Unit> {
        &self.units
    }

    /// Processes an event, updating the unit it targets.
    fn process_event(&mut self, event: Event) -> Result<(), LedgerError> {
        let period_fee = self.period_fee;
        let unit = self.get_or_create_unit(event.get_unit_id());
        unit.process_event(event, period_fee)
    }

    /// Runs the ledger loop, processing events from the receiver until it closes.
    pub async fn run(&mut self) {
        let mut processed = 0usize;
        let mut failed = 0usize;
        while let Some(event) = self.receiver.recv().await {
            let (event_type, unit_id, reference) = (
                event.get_type(),
                event.get_unit_id().to_owned(),
                event.get_reference(),
            );
            match self.process_event(event) {
                Ok(()) => processed += 1,
                Err(err) => {
                    failed += 1;
                    warn!(unit = %unit_id, reference, ?event_type, error = %err, "event rejected");
                }
            }
        }
        info!(processed, failed, units = self.units.len(), "ledger drained");
    }
}
