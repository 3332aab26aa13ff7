use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PayoffRegime;
use crate::error::PayoffError;
use crate::terms::{IncomeNoteTerms, IncomeVariant};
use crate::types::{Money, Percent};
use crate::PayoffResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponPeriod {
    pub period: u32,
    /// Months after trade date; fractional for frequencies that do not divide 12.
    pub month: Decimal,
    pub coupon: Percent,
}

/// Redemption at maturity, excluding coupons.
///
/// At or above the barrier the note pays par. Below it the investor receives
/// shares priced at the conversion strike: the reference level for the
/// standard variant, the lower strike for the geared put. A geared put never
/// redeems above par, so the conversion leg is capped at 100.
pub(crate) fn redemption(terms: &IncomeNoteTerms, level: Percent) -> (Percent, PayoffRegime) {
    if level >= terms.barrier {
        return (Percent::HUNDRED, PayoffRegime::Par);
    }
    let converted = conversion_value(terms, level);
    match terms.variant {
        IncomeVariant::StandardBarrier => (converted, PayoffRegime::Conversion),
        IncomeVariant::LowStrikeGearedPut => {
            if converted >= Percent::HUNDRED {
                (Percent::HUNDRED, PayoffRegime::Par)
            } else {
                (converted, PayoffRegime::Conversion)
            }
        }
    }
}

/// Value of the delivered shares as % of notional: `100 * level / strike * ratio`.
pub(crate) fn conversion_value(terms: &IncomeNoteTerms, level: Percent) -> Percent {
    let strike = terms.conversion_strike();
    Percent::new(
        Decimal::ONE_HUNDRED * level.value() / strike.value() * terms.conversion_ratio,
    )
}

/// Whole coupon periods in the tenor.
pub fn coupon_periods(terms: &IncomeNoteTerms, tenor_months: u32) -> u32 {
    if terms.coupon_frequency == 0 {
        return 0;
    }
    tenor_months * terms.coupon_frequency / 12
}

pub fn coupon_per_period(terms: &IncomeNoteTerms) -> Percent {
    if terms.coupon_frequency == 0 {
        return Percent::ZERO;
    }
    Percent::new(terms.coupon_rate_pa.value() / Decimal::from(terms.coupon_frequency))
}

/// Total coupon over the tenor as % of notional.
pub fn total_coupon_pct(terms: &IncomeNoteTerms, tenor_months: u32) -> Percent {
    coupon_per_period(terms) * Decimal::from(coupon_periods(terms, tenor_months))
}

pub fn coupon_schedule(terms: &IncomeNoteTerms, tenor_months: u32) -> Vec<CouponPeriod> {
    let per_period = coupon_per_period(terms);
    (1..=coupon_periods(terms, tenor_months))
        .map(|period| CouponPeriod {
            period,
            month: Decimal::from(period * 12) / Decimal::from(terms.coupon_frequency),
            coupon: per_period,
        })
        .collect()
}

/// Number of shares delivered on conversion for one underlying with the
/// given initial fixing.
pub fn shares_delivered(
    terms: &IncomeNoteTerms,
    notional: Money,
    initial_fixing: Money,
) -> PayoffResult<Decimal> {
    if notional <= Decimal::ZERO {
        return Err(PayoffError::invalid("notional", "must be positive"));
    }
    let conversion_price = initial_fixing * terms.conversion_strike().as_fraction();
    if conversion_price <= Decimal::ZERO {
        return Err(PayoffError::DivisionByZero {
            context: "conversion price (initial fixing x strike)".into(),
        });
    }
    Ok(notional * terms.conversion_ratio / conversion_price)
}
