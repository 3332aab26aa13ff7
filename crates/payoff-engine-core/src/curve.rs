use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PayoffError;
use crate::landmarks::landmarks;
use crate::payoff::evaluate_unchecked;
use crate::terms::{ParticipationDirection, ProductFamily, ProductTerms};
use crate::types::{Percent, MAX_LEVEL};
use crate::PayoffResult;

/// Offset of the extra sample placed just below each jump.
const STRADDLE_OFFSET: Decimal = dec!(0.01);

const MAX_GRID_POINTS: u32 = 20_000;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    #[serde(default = "default_min_level")]
    pub min_level: Percent,
    #[serde(default = "default_max_level")]
    pub max_level: Percent,
    #[serde(default = "default_step")]
    pub step: Percent,
}

fn default_min_level() -> Percent {
    Percent::ZERO
}

fn default_max_level() -> Percent {
    Percent::new(dec!(160))
}

fn default_step() -> Percent {
    Percent::new(Decimal::ONE)
}

impl Default for CurveConfig {
    fn default() -> Self {
        CurveConfig {
            min_level: default_min_level(),
            max_level: default_max_level(),
            step: default_step(),
        }
    }
}

impl CurveConfig {
    fn validate(&self) -> PayoffResult<()> {
        if self.min_level.is_negative() {
            return Err(PayoffError::invalid("curve.min_level", "cannot be negative"));
        }
        if self.max_level <= self.min_level {
            return Err(PayoffError::invalid(
                "curve.max_level",
                "must be greater than min_level",
            ));
        }
        if !self.step.is_positive() {
            return Err(PayoffError::invalid("curve.step", "must be positive"));
        }
        if self.max_level.value() > MAX_LEVEL {
            return Err(PayoffError::invalid(
                "curve.max_level",
                format!("cannot exceed the {MAX_LEVEL}% level ceiling"),
            ));
        }
        let points = (self.max_level - self.min_level)
            .value()
            .checked_div(self.step.value())
            .unwrap_or(Decimal::MAX);
        if points > Decimal::from(MAX_GRID_POINTS) {
            return Err(PayoffError::invalid(
                "curve.step",
                format!("grid would exceed {MAX_GRID_POINTS} points"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub level: Percent,
    pub redemption_pct: Percent,
    pub total_pct: Percent,
}

/// Extremes of the total payoff over the curve range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffProfile {
    /// `None` when upside is unbounded.
    pub max_total_pct: Option<Percent>,
    pub min_total_pct: Percent,
    pub max_loss_pct: Percent,
    pub capital_at_risk: bool,
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

pub fn generate_curve(terms: &ProductTerms) -> PayoffResult<Vec<CurvePoint>> {
    generate_curve_with(terms, &CurveConfig::default())
}

/// Sample the payoff on a regular grid plus every landmark.
///
/// Landmarks outside the grid are still sampled (above `max_level` included),
/// and each jump gets a sample at `landmark - 0.01` so the discontinuity is
/// drawn as two adjacent points rather than a slope.
pub fn generate_curve_with(
    terms: &ProductTerms,
    config: &CurveConfig,
) -> PayoffResult<Vec<CurvePoint>> {
    terms.validate()?;
    config.validate()?;

    let mut levels = Vec::new();
    let mut level = config.min_level;
    while level <= config.max_level {
        levels.push(level);
        level = level + config.step;
    }

    let straddle = Percent::new(STRADDLE_OFFSET);
    for mark in landmarks(terms)? {
        if mark.level < config.min_level || mark.level.value() > MAX_LEVEL {
            continue;
        }
        levels.push(mark.level);
        if mark.kind.is_discontinuity() && mark.level - straddle >= config.min_level {
            levels.push(mark.level - straddle);
        }
    }

    levels.sort();
    levels.dedup();

    let curve: Vec<CurvePoint> = levels
        .into_iter()
        .map(|level| {
            let v = evaluate_unchecked(terms, level);
            CurvePoint {
                level,
                redemption_pct: v.redemption_pct,
                total_pct: v.total_pct,
            }
        })
        .collect();

    debug!(points = curve.len(), "payoff curve generated");
    Ok(curve)
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

pub fn payoff_profile(terms: &ProductTerms, curve: &[CurvePoint]) -> PayoffResult<PayoffProfile> {
    let first = curve.first().ok_or_else(|| {
        PayoffError::invalid("curve", "cannot profile an empty curve")
    })?;

    let (mut min_total, mut max_total) = (first.total_pct, first.total_pct);
    for p in curve {
        min_total = min_total.min(p.total_pct);
        max_total = max_total.max(p.total_pct);
    }

    let unbounded = match &terms.product {
        ProductFamily::IncomeNote(_) => false,
        ProductFamily::ProtectionNote(t) => {
            t.direction == ParticipationDirection::Up
                && t.active_cap().is_none()
                && t.participation_rate.is_positive()
        }
    };

    Ok(PayoffProfile {
        max_total_pct: (!unbounded).then_some(max_total),
        min_total_pct: min_total,
        max_loss_pct: (Percent::HUNDRED - min_total).max(Percent::ZERO),
        capital_at_risk: min_total < Percent::HUNDRED,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
