//! Tugrik amounts using decimal arithmetic.
//!
//! Every balance, fare and ledger entry is a [`Money`]. Floating point is never
//! used for money; arithmetic is checked so an overflow surfaces as `None`
//! instead of wrapping.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 code of the only currency the service handles.
pub const CURRENCY_CODE: &str = "MNT";

/// An amount of Mongolian tugrik.
///
/// Serialized as a decimal string (`"5000"`), deserialized from either a
/// string or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero tugrik.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Number of fractional digits an amount may carry.
    pub const MAX_SCALE: u32 = 2;

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole tugrik.
    #[must_use]
    pub fn from_major(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `true` if strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// `true` if the amount has no more than [`Self::MAX_SCALE`] fractional digits.
    #[must_use]
    pub fn has_valid_scale(&self) -> bool {
        self.0.normalize().scale() <= Self::MAX_SCALE
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Checked multiplication by a whole quantity (seats, for example).
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {CURRENCY_CODE}", self.0.normalize())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|m| m.0).sum())
    }
}
