use std::{
    fmt::Display,
    iter::Sum,
    ops::Add,
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

/// Catalog prices are quoted in this currency unless a product says otherwise.
pub const DEFAULT_PRICE_CURRENCY: &str = "USD";

//--------------------------------------       Amount        ---------------------------------------------------------
/// A fixed-point monetary value.
///
/// Amounts are exact decimals, so a price of `19.99` stays `19.99` through storage, arithmetic and JSON. In the
/// database they are stored as TEXT and converted back with [`TryFrom<String>`]; over JSON they travel as strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(scalar Amount, Mul, mul, u32);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|e| AmountConversionError(format!("'{s}' is not a decimal number. {e}")))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Amount {
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// True if this amount, taken as a payment received, covers `expected` with a shortfall of at most
    /// `tolerance` (a fraction of `expected`, e.g. `0.005` for half a percent). Overpayment always covers.
    pub fn covers(&self, expected: Amount, tolerance: Decimal) -> bool {
        let allowed_shortfall = expected.0 * tolerance.abs();
        self.0 >= expected.0 - allowed_shortfall
    }

    /// Multiplies a unit price by a quantity. `None` if the total does not fit in a `Decimal`.
    pub fn checked_mul(&self, quantity: u32) -> Option<Amount> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Returns `self × part / whole`, or `None` if `whole` is zero or the result overflows.
    pub fn pro_rata(&self, part: Amount, whole: Amount) -> Option<Amount> {
        if whole.0.is_zero() {
            return None;
        }
        self.0.checked_mul(part.0).and_then(|v| v.checked_div(whole.0)).map(Self)
    }
}
