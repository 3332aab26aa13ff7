use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Highest settlement level the engine accepts (10,000x the reference).
pub const MAX_LEVEL: Decimal = dec!(1000000);

/// A level, rate or payoff on the 0–100 percent scale (87.3 = 87.3%).
///
/// Every barrier, strike, floor, cap, coupon rate and redemption in the engine
/// is carried as a `Percent`. Fractions (0.873) only enter through
/// [`Percent::from_fraction`] and only leave through [`Percent::as_fraction`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);
    pub const HUNDRED: Percent = Percent(Decimal::ONE_HUNDRED);

    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Convert a 0–1 fraction (0.70) into a percent (70).
    pub fn from_fraction(fraction: Decimal) -> Self {
        Percent(fraction * Decimal::ONE_HUNDRED)
    }

    pub fn as_fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Percent(self.0.abs())
    }

    /// Round to `dp` decimal places for display.
    pub fn round_dp(self, dp: u32) -> Self {
        Percent(self.0.round_dp(dp))
    }

    /// Apply this percent to a cash amount: 92% of 1,000 = 920.
    pub fn of(self, amount: Money) -> Money {
        amount * self.as_fraction()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl From<Decimal> for Percent {
    fn from(value: Decimal) -> Self {
        Percent(value)
    }
}

impl Add for Percent {
    type Output = Percent;
    fn add(self, rhs: Percent) -> Percent {
        Percent(self.0 + rhs.0)
    }
}

impl Sub for Percent {
    type Output = Percent;
    fn sub(self, rhs: Percent) -> Percent {
        Percent(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Percent {
    type Output = Percent;
    fn mul(self, rhs: Decimal) -> Percent {
        Percent(self.0 * rhs)
    }
}

impl std::iter::Sum for Percent {
    fn sum<I: Iterator<Item = Percent>>(iter: I) -> Percent {
        Percent(iter.map(|p| p.0).sum())
    }
}

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    Other(String),
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
