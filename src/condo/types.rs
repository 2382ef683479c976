//! Types used throughout the condominium ledger.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de};
use thiserror::Error;

/// Number of decimal places of the local currency.
pub const CURRENCY_SCALE: u32 = 2;

/// Unit ID type, identifying a condominium unit (e.g. `A-101`).
pub type UnitId = String;

/// Debt ID type, representing a unique identifier for a charged debt.
pub type DebtId = u32;

/// Payment ID type, representing a unique identifier for a reported payment.
pub type PaymentId = u32;

/// A billing period (calendar month), ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    /// Creates a period, returning `None` if the month is not in `1..=12`.
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Period { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Error returned when a period string is not `YYYY-MM`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid period `{0}`, expected YYYY-MM")]
pub struct ParsePeriodError(String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePeriodError(s.to_owned());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse().map_err(|_| err())?;
        let month = month.parse().map_err(|_| err())?;
        Period::new(year, month).ok_or_else(err)
    }
}

/// Custom deserializer for optional `YYYY-MM` columns.
pub(crate) fn deserialize_period<'de, D>(deserializer: D) -> Result<Option<Period>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse().map_err(de::Error::custom))
        .transpose()
}
