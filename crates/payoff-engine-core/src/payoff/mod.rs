//! Payoff evaluation at maturity.
//!
//! One evaluator serves every consumer (curve, scenario table, break-even
//! checks, report layer). Results are percentages of notional.

pub mod income;
pub mod protection;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basket::{resolve_basket_spec, BasketResolution};
use crate::error::PayoffError;
use crate::terms::{ProductFamily, ProductTerms};
use crate::types::{Percent, MAX_LEVEL};
use crate::PayoffResult;

pub use income::{coupon_schedule, shares_delivered, CouponPeriod};

/// Which branch of the payoff function produced a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffRegime {
    /// Income note redeemed in cash at par.
    Par,
    /// Income note converted into shares.
    Conversion,
    ProtectedFloor,
    Participation,
    Capped,
    KnockedIn,
    BonusFloor,
    BonusBreached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffValue {
    pub level: Percent,
    /// Redemption excluding income.
    pub redemption_pct: Percent,
    /// Fixed income accrued over the tenor.
    pub income_pct: Percent,
    pub total_pct: Percent,
    pub regime: PayoffRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvaluation {
    pub basket: BasketResolution,
    pub payoff: PayoffValue,
}

/// Redemption only, as % of notional.
pub fn payoff_pct(terms: &ProductTerms, level: Percent) -> PayoffResult<Percent> {
    Ok(evaluate_payoff(terms, level)?.redemption_pct)
}

/// Fixed income accrued over the full tenor (zero for protection notes).
pub fn accrued_income(terms: &ProductTerms) -> Percent {
    match &terms.product {
        ProductFamily::IncomeNote(t) => income::total_coupon_pct(t, terms.tenor_months),
        ProductFamily::ProtectionNote(_) => Percent::ZERO,
    }
}

pub fn evaluate_payoff(terms: &ProductTerms, level: Percent) -> PayoffResult<PayoffValue> {
    terms.validate()?;
    check_level(level)?;
    Ok(evaluate_unchecked(terms, level))
}

/// Resolve the basket from the spots on the terms and evaluate there.
pub fn evaluate_at_market(terms: &ProductTerms) -> PayoffResult<MarketEvaluation> {
    terms.validate()?;
    let basket = resolve_basket_spec(&terms.basket)?;
    let payoff = evaluate_unchecked(terms, basket.level);
    Ok(MarketEvaluation { basket, payoff })
}

pub(crate) fn check_level(level: Percent) -> PayoffResult<()> {
    if level.is_negative() {
        return Err(PayoffError::invalid(
            "level",
            format!("settlement level cannot be negative, got {level}"),
        ));
    }
    if level.value() > MAX_LEVEL {
        return Err(PayoffError::invalid(
            "level",
            format!("settlement level {level} exceeds the {MAX_LEVEL}% ceiling"),
        ));
    }
    Ok(())
}

/// Evaluate terms already known to be valid.
pub(crate) fn evaluate_unchecked(terms: &ProductTerms, level: Percent) -> PayoffValue {
    let (redemption_pct, regime) = match &terms.product {
        ProductFamily::IncomeNote(t) => income::redemption(t, level),
        ProductFamily::ProtectionNote(t) => protection::redemption(t, level),
    };
    let income_pct = accrued_income(terms);
    debug!(%level, %redemption_pct, ?regime, "payoff evaluated");
    PayoffValue {
        level,
        redemption_pct,
        income_pct,
        total_pct: redemption_pct + income_pct,
        regime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::{
        BasketSpec, CapType, IncomeNoteTerms, IncomeVariant, ParticipationDirection,
        ProtectionNoteTerms, Underlying,
    };
    use crate::types::Currency;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rc(spot: Option<Decimal>) -> ProductTerms {
        ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            BasketSpec::single(Underlying {
                ticker: "AAPL".into(),
                initial_fixing: dec!(200),
                spot,
            }),
            ProductFamily::IncomeNote(IncomeNoteTerms {
                variant: IncomeVariant::StandardBarrier,
                barrier: Percent::new(dec!(70)),
                strike: None,
                coupon_rate_pa: Percent::new(dec!(8)),
                coupon_frequency: 4,
                conversion_ratio: Decimal::ONE,
                autocall_level: None,
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_total_includes_coupons() {
        let v = evaluate_payoff(&rc(None), Percent::new(dec!(50))).unwrap();
        assert_eq!(v.redemption_pct, Percent::new(dec!(50)));
        assert_eq!(v.income_pct, Percent::new(dec!(8)));
        assert_eq!(v.total_pct, Percent::new(dec!(58)));
    }

    #[test]
    fn test_negative_level_rejected() {
        assert!(evaluate_payoff(&rc(None), Percent::new(dec!(-1))).is_err());
    }

    #[test]
    fn test_protection_note_has_no_income() {
        let terms = ProductTerms::new(
            dec!(100000),
            24,
            Currency::EUR,
            rc(None).basket,
            ProductFamily::ProtectionNote(ProtectionNoteTerms {
                protection_floor: Percent::new(dec!(100)),
                participation_start: Percent::new(dec!(100)),
                participation_rate: Percent::new(dec!(120)),
                direction: ParticipationDirection::Up,
                cap_type: CapType::None,
                cap_level: None,
                knock_in: None,
                bonus: None,
            }),
        )
        .unwrap();
        assert_eq!(accrued_income(&terms), Percent::ZERO);
        let v = evaluate_payoff(&terms, Percent::new(dec!(110))).unwrap();
        assert_eq!(v.total_pct, Percent::new(dec!(112)));
    }

    #[test]
    fn test_evaluate_at_market() {
        let m = evaluate_at_market(&rc(Some(dec!(130)))).unwrap();
        assert_eq!(m.basket.level, Percent::new(dec!(65)));
        assert_eq!(m.payoff.regime, PayoffRegime::Conversion);
        assert_eq!(m.payoff.total_pct, Percent::new(dec!(73)));
    }
}
