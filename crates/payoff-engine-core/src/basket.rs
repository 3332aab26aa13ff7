use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PayoffError;
use crate::terms::{BasketRule, BasketSpec};
use crate::types::{Money, Percent, MAX_LEVEL};
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLevel {
    pub ticker: String,
    pub level: Percent,
}

/// Settlement level of a basket plus the asset that drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketResolution {
    pub level: Percent,
    /// `None` for averaged baskets, which have no single driver.
    pub driving_index: Option<usize>,
    pub components: Vec<ComponentLevel>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Reduce N price ratios `spot_i / fixing_i` to a single settlement level.
///
/// Worst-of and best-of break exact ties on the lowest index.
pub fn resolve_basket(
    spec: &BasketSpec,
    spots: &[Money],
    fixings: &[Money],
) -> PayoffResult<BasketResolution> {
    if spots.is_empty() || fixings.is_empty() {
        return Err(PayoffError::invalid(
            "spots",
            "at least one spot/fixing pair is required",
        ));
    }
    if spots.len() != fixings.len() {
        return Err(PayoffError::invalid(
            "spots",
            format!(
                "{} spots supplied for {} fixings",
                spots.len(),
                fixings.len()
            ),
        ));
    }
    if spec.rule == BasketRule::Single && spots.len() != 1 {
        return Err(PayoffError::invalid(
            "spots",
            format!("single basket takes exactly one price, got {}", spots.len()),
        ));
    }

    let mut components = Vec::with_capacity(spots.len());
    for (i, (&spot, &fixing)) in spots.iter().zip(fixings).enumerate() {
        if fixing.is_zero() {
            return Err(PayoffError::invalid(
                format!("fixings[{i}]"),
                "initial fixing is zero; normalised level is undefined",
            ));
        }
        if fixing < Decimal::ZERO {
            return Err(PayoffError::invalid(
                format!("fixings[{i}]"),
                "initial fixing must be positive",
            ));
        }
        if spot < Decimal::ZERO {
            return Err(PayoffError::invalid(
                format!("spots[{i}]"),
                "spot cannot be negative",
            ));
        }
        let ticker = spec
            .underlyings
            .get(i)
            .map(|u| u.ticker.clone())
            .unwrap_or_else(|| format!("#{i}"));
        let level = spot
            .checked_div(fixing)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .filter(|l| *l <= MAX_LEVEL)
            .ok_or_else(|| {
                PayoffError::invalid(
                    format!("spots[{i}]"),
                    format!("spot / initial fixing exceeds the {MAX_LEVEL}% level ceiling"),
                )
            })?;
        components.push(ComponentLevel {
            ticker,
            level: Percent::new(level),
        });
    }

    let (level, driving_index) = match spec.rule {
        BasketRule::Single => (components[0].level, Some(0)),
        BasketRule::WorstOf => {
            let idx = extreme_index(&components, |candidate, best| candidate < best);
            (components[idx].level, Some(idx))
        }
        BasketRule::BestOf => {
            let idx = extreme_index(&components, |candidate, best| candidate > best);
            (components[idx].level, Some(idx))
        }
        BasketRule::Average => {
            let sum: Percent = components.iter().map(|c| c.level).sum();
            let n = Decimal::from(components.len() as u64);
            (Percent::new(sum.value() / n), None)
        }
    };

    debug!(rule = %spec.rule, %level, ?driving_index, "basket resolved");

    Ok(BasketResolution {
        level,
        driving_index,
        components,
    })
}

/// Resolve using the spots and fixings carried on the basket's underlyings.
pub fn resolve_basket_spec(spec: &BasketSpec) -> PayoffResult<BasketResolution> {
    spec.validate()?;
    let mut spots = Vec::with_capacity(spec.underlyings.len());
    for (i, u) in spec.underlyings.iter().enumerate() {
        let spot = u.spot.ok_or_else(|| {
            PayoffError::invalid(
                format!("basket.underlyings[{i}].spot"),
                format!("no spot price supplied for {}", u.ticker),
            )
        })?;
        spots.push(spot);
    }
    let fixings: Vec<Money> = spec.underlyings.iter().map(|u| u.initial_fixing).collect();
    resolve_basket(spec, &spots, &fixings)
}

/// Index of the strictly-better element; first occurrence wins ties.
fn extreme_index(
    components: &[ComponentLevel],
    better: impl Fn(Percent, Percent) -> bool,
) -> usize {
    let mut best = 0;
    for (i, c) in components.iter().enumerate().skip(1) {
        if better(c.level, components[best].level) {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
