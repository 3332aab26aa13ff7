use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::basket::{resolve_basket_spec, BasketResolution};
use crate::breakeven::{solve_break_even, BreakEvenResult};
use crate::curve::{generate_curve_with, payoff_profile, CurveConfig, CurvePoint, PayoffProfile};
use crate::landmarks::{landmarks, Landmark};
use crate::payoff::{
    accrued_income, coupon_schedule, evaluate_unchecked, shares_delivered, CouponPeriod,
    PayoffValue,
};
use crate::scenarios::{build_scenario_table, standard_scenario_levels, ScenarioRow};
use crate::terms::{BasketRule, ProductFamily, ProductTerms};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Percent};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysisRequest {
    pub terms: ProductTerms,
    #[serde(default)]
    pub curve: CurveConfig,
    /// Defaults to the standard illustrative levels.
    #[serde(default)]
    pub scenario_levels: Option<Vec<Percent>>,
    /// Scales the scenario table; defaults to the terms' notional.
    #[serde(default)]
    pub notional: Option<Money>,
}

impl ProductAnalysisRequest {
    pub fn new(terms: ProductTerms) -> Self {
        ProductAnalysisRequest {
            terms,
            curve: CurveConfig::default(),
            scenario_levels: None,
            notional: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub basket: BasketResolution,
    pub payoff: PayoffValue,
    /// Percentage points between the current level and the protective
    /// barrier (barrier, knock-in or bonus barrier). Negative once breached.
    pub barrier_buffer: Option<Percent>,
}

/// Shares delivered if an income note converts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionShares {
    pub ticker: String,
    pub shares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub product_name: String,
    pub currency: Currency,
    pub notional: Money,
    pub tenor_months: u32,
    pub maturity_date: Option<NaiveDate>,
    pub total_income_pct: Percent,
    pub coupon_schedule: Vec<CouponPeriod>,
    pub break_even: BreakEvenResult,
    pub break_even_summary: String,
    pub landmarks: Vec<Landmark>,
    pub profile: PayoffProfile,
    pub market: Option<MarketSnapshot>,
    pub conversion_shares: Option<ConversionShares>,
    pub curve: Vec<CurvePoint>,
    pub scenarios: Vec<ScenarioRow>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Level below which the investor loses protection.
fn protective_barrier(terms: &ProductTerms) -> Option<Percent> {
    match &terms.product {
        ProductFamily::IncomeNote(t) => Some(t.barrier),
        ProductFamily::ProtectionNote(t) => t
            .bonus
            .as_ref()
            .map(|b| b.bonus_barrier)
            .or_else(|| t.knock_in.as_ref().map(|ki| ki.level)),
    }
}

fn market_snapshot(
    terms: &ProductTerms,
    warnings: &mut Vec<String>,
) -> PayoffResult<Option<MarketSnapshot>> {
    if terms.basket.underlyings.iter().any(|u| u.spot.is_none()) {
        warnings.push("No spot prices supplied; market snapshot omitted".into());
        return Ok(None);
    }
    let basket = resolve_basket_spec(&terms.basket)?;
    let payoff = evaluate_unchecked(terms, basket.level);
    let barrier_buffer = protective_barrier(terms).map(|b| basket.level - b);
    if let Some(buffer) = barrier_buffer {
        if buffer.is_negative() {
            warnings.push(format!(
                "Basket level {} is currently below the protective barrier",
                basket.level.round_dp(2)
            ));
        }
    }
    Ok(Some(MarketSnapshot {
        basket,
        payoff,
        barrier_buffer,
    }))
}

/// Worst-of/best-of notes deliver the driving underlying; averaged baskets
/// settle in cash and deliver nothing.
fn conversion_shares(
    terms: &ProductTerms,
    market: Option<&MarketSnapshot>,
) -> PayoffResult<Option<ConversionShares>> {
    let ProductFamily::IncomeNote(t) = &terms.product else {
        return Ok(None);
    };
    let index = match terms.basket.rule {
        BasketRule::Single => Some(0),
        BasketRule::Average => None,
        BasketRule::WorstOf | BasketRule::BestOf => market.and_then(|m| m.basket.driving_index),
    };
    let Some(underlying) = index.and_then(|i| terms.basket.underlyings.get(i)) else {
        return Ok(None);
    };
    Ok(Some(ConversionShares {
        ticker: underlying.ticker.clone(),
        shares: shares_delivered(t, terms.notional, underlying.initial_fixing)?,
    }))
}

fn methodology(terms: &ProductTerms) -> &'static str {
    match &terms.product {
        ProductFamily::IncomeNote(_) => {
            "Reverse convertible: par above barrier, share delivery at conversion strike below; \
             closed-form break-even net of coupons"
        }
        ProductFamily::ProtectionNote(t) if t.bonus.is_some() => {
            "Bonus certificate: bonus floor over participation while barrier holds, 1:1 below"
        }
        ProductFamily::ProtectionNote(t) if t.knock_in.is_some() => {
            "Protected participation with knock-in regime switch to geared downside"
        }
        ProductFamily::ProtectionNote(_) => {
            "Capital-protected participation: floor plus capped linear participation, \
             linear break-even inversion"
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn analyze_product(
    request: &ProductAnalysisRequest,
) -> PayoffResult<ComputationOutput<ProductAnalysis>> {
    let start = Instant::now();
    let terms = &request.terms;
    terms.validate()?;

    let mut warnings = Vec::new();

    let break_even = solve_break_even(terms)?;
    match &break_even {
        BreakEvenResult::Impossible { reason } => {
            warnings.push(format!("Break-even not reachable: {reason}"));
        }
        BreakEvenResult::Level {
            note: Some(note), ..
        } => {
            warnings.push(format!("Break-even {note}"));
        }
        _ => {}
    }

    let curve = generate_curve_with(terms, &request.curve)?;
    let profile = payoff_profile(terms, &curve)?;

    let levels = match &request.scenario_levels {
        Some(levels) => levels.clone(),
        None => standard_scenario_levels(terms)?,
    };
    let notional = request.notional.unwrap_or(terms.notional);
    let scenarios = build_scenario_table(terms, notional, &levels)?;

    let market = market_snapshot(terms, &mut warnings)?;
    let conversion_shares = conversion_shares(terms, market.as_ref())?;

    let coupons = match &terms.product {
        ProductFamily::IncomeNote(t) => coupon_schedule(t, terms.tenor_months),
        ProductFamily::ProtectionNote(_) => Vec::new(),
    };

    let analysis = ProductAnalysis {
        product_name: terms.product_name(),
        currency: terms.currency.clone(),
        notional: terms.notional,
        tenor_months: terms.tenor_months,
        maturity_date: terms.maturity_date(),
        total_income_pct: accrued_income(terms),
        coupon_schedule: coupons,
        break_even_summary: break_even.summary(),
        break_even,
        landmarks: landmarks(terms)?,
        profile,
        market,
        conversion_shares,
        curve,
        scenarios,
    };

    debug!(
        product = %analysis.product_name,
        curve_points = analysis.curve.len(),
        scenarios = analysis.scenarios.len(),
        "product analysed"
    );

    let assumptions = serde_json::json!({
        "product": analysis.product_name,
        "basket_rule": terms.basket.rule.to_string(),
        "notional": terms.notional.to_string(),
        "tenor_months": terms.tenor_months,
        "percent_convention": "0-100 scale of reference level",
        "observation": "European, at maturity only",
        "curve_range": format!("{}..={} step {}", request.curve.min_level, request.curve.max_level, request.curve.step),
    });

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        methodology(terms),
        &assumptions,
        warnings,
        elapsed,
        analysis,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
