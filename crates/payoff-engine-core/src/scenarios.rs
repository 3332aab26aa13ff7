use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PayoffError;
use crate::landmarks::landmarks;
use crate::payoff::{check_level, evaluate_unchecked, PayoffRegime};
use crate::terms::ProductTerms;
use crate::types::{Money, Percent, MAX_LEVEL};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub level: Percent,
    pub underlying_return_pct: Percent,
    pub redemption_pct: Percent,
    pub coupon_pct: Percent,
    pub total_pct: Percent,
    pub total_return_pct: Percent,
    pub redemption_amount: Money,
    pub coupon_amount: Money,
    pub total_amount: Money,
    pub regime: PayoffRegime,
}

// ---------------------------------------------------------------------------
// Scenario levels
// ---------------------------------------------------------------------------

/// 40%..=150% in 10-point steps plus every landmark of the product.
pub fn standard_scenario_levels(terms: &ProductTerms) -> PayoffResult<Vec<Percent>> {
    let mut levels: Vec<Percent> = (4..=15)
        .map(|i| Percent::new(Decimal::from(i * 10)))
        .collect();
    levels.extend(
        landmarks(terms)?
            .into_iter()
            .map(|m| m.level)
            .filter(|l| l.value() <= MAX_LEVEL),
    );
    levels.sort();
    levels.dedup();
    Ok(levels)
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

pub fn build_scenario_table(
    terms: &ProductTerms,
    notional: Money,
    levels: &[Percent],
) -> PayoffResult<Vec<ScenarioRow>> {
    terms.validate()?;
    if notional <= Decimal::ZERO {
        return Err(PayoffError::invalid("notional", "must be positive"));
    }
    if levels.is_empty() {
        return Err(PayoffError::invalid(
            "levels",
            "at least one scenario level is required",
        ));
    }

    levels
        .iter()
        .map(|&level| {
            check_level(level)?;
            let v = evaluate_unchecked(terms, level);
            let redemption_amount = v.redemption_pct.of(notional);
            let coupon_amount = v.income_pct.of(notional);
            Ok(ScenarioRow {
                level,
                underlying_return_pct: level - Percent::HUNDRED,
                redemption_pct: v.redemption_pct,
                coupon_pct: v.income_pct,
                total_pct: v.total_pct,
                total_return_pct: v.total_pct - Percent::HUNDRED,
                redemption_amount,
                coupon_amount,
                total_amount: redemption_amount + coupon_amount,
                regime: v.regime,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
