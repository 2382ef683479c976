//! Exact currency amounts.
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize, de};

use crate::condo::CURRENCY_SCALE;

/// A money amount in the local currency, held as an exact decimal at
/// currency precision.
///
/// Every constructor rounds half away from zero to [`CURRENCY_SCALE`]
/// places, so sums and comparisons between amounts never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, CURRENCY_SCALE));

    /// The largest amount that still holds two decimal places.
    pub const MAX: Money = Money(Decimal::from_parts(
        u32::MAX,
        u32::MAX,
        u32::MAX,
        false,
        CURRENCY_SCALE,
    ));

    /// Creates an amount from an arbitrary decimal, rounding to currency precision.
    ///
    /// Beyond [`Money::MAX`] the decimal cannot keep two places; use
    /// [`Money::try_new`] for untrusted input.
    pub fn new(value: Decimal) -> Self {
        let mut value =
            value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(CURRENCY_SCALE);
        Money(value)
    }

    /// Like [`Money::new`], but returns `None` if the amount exceeds [`Money::MAX`]
    /// in magnitude.
    pub fn try_new(value: Decimal) -> Option<Self> {
        let value =
            value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Money::in_range(value)
    }

    fn in_range(mut value: Decimal) -> Option<Self> {
        if value.abs() > Money::MAX.0 {
            return None;
        }
        value.rescale(CURRENCY_SCALE);
        Some(Money(value))
    }

    /// Creates an amount from a count of cents.
    pub fn from_cents(cents: i64) -> Self {
        Money::new(Decimal::new(cents, CURRENCY_SCALE))
    }

    /// Converts a foreign-currency amount at the given exchange rate.
    ///
    /// Returns `None` if the converted amount is out of range.
    pub fn convert(amount: Decimal, rate: Decimal) -> Option<Self> {
        amount.checked_mul(rate).and_then(Money::try_new)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).and_then(Money::in_range)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).and_then(Money::in_range)
    }

    /// The amount multiplied by a whole number of periods, or `None` if out of range.
    pub fn checked_times(self, count: u64) -> Option<Money> {
        self.0
            .checked_mul(Decimal::from(count))
            .and_then(Money::in_range)
    }

    /// How many whole `unit` amounts fit in `self`.
    ///
    /// Returns `None` if `unit` is not positive or the count overflows `u64`.
    pub fn whole_multiples_of(&self, unit: Money) -> Option<u64> {
        if unit.0 <= Decimal::ZERO {
            return None;
        }
        if self.0 < unit.0 {
            return Some(0);
        }
        let mut count = self.0.checked_div(unit.0)?.floor().to_u64()?;
        // Division rounds at 28 significant digits; settle the last step exactly.
        let fits = |n: u64| unit.checked_times(n).is_some_and(|used| used <= *self);
        while count > 0 && !fits(count) {
            count -= 1;
        }
        while fits(count.checked_add(1)?) {
            count += 1;
        }
        Some(count)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())?;
        Money::try_new(value).ok_or(rust_decimal::Error::ExceedsMaximumPossibleValue)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

/// Custom deserializer for optional decimal columns, where an empty field means `None`.
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| Decimal::from_str(v.trim()).map_err(de::Error::custom))
        .transpose()
}
