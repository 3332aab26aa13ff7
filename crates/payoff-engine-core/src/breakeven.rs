use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PayoffError;
use crate::payoff::income::total_coupon_pct;
use crate::payoff::protection::max_participation_payoff;
use crate::terms::{
    IncomeNoteTerms, ParticipationDirection, ProductFamily, ProductTerms, ProtectionNoteTerms,
};
use crate::types::Percent;
use crate::PayoffResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Settlement level(s) at which total return is exactly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakEvenResult {
    /// Guaranteed value (floor or coupons) is already at or above par.
    Always { guaranteed_pct: Percent },
    Level {
        level: Percent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Impossible { reason: String },
    KnockInConditional {
        knock_in_level: Percent,
        downside_strike: Percent,
        /// Break-even of the protected regime, when it lies at or above the knock-in.
        protected_break_even: Option<Percent>,
        /// The protected regime already returns par.
        par_protected: bool,
        /// Break-even inside the knocked-in regime, only when the downside
        /// strike sits below the knock-in level.
        knocked_in_break_even: Option<Percent>,
        note: String,
    },
    BonusConditional {
        bonus_level: Percent,
        bonus_barrier: Percent,
        /// Participation break-even while the barrier holds, when the bonus
        /// alone does not reach par.
        surviving_break_even: Option<Percent>,
        /// Bonus level is at or above par while the barrier holds.
        par_protected: bool,
        /// Below the barrier the note tracks the underlying 1:1.
        breached_break_even: Percent,
        note: String,
    },
}

impl BreakEvenResult {
    /// The single solved level, or `Unsolvable` for every other outcome.
    pub fn require_level(&self) -> PayoffResult<Percent> {
        match self {
            BreakEvenResult::Level { level, .. } => Ok(*level),
            other => Err(PayoffError::Unsolvable(other.summary())),
        }
    }

    pub fn is_reachable(&self) -> bool {
        !matches!(self, BreakEvenResult::Impossible { .. })
    }

    /// One-line statement for report renderers.
    pub fn summary(&self) -> String {
        match self {
            BreakEvenResult::Always { guaranteed_pct } => format!(
                "Break-even always met: guaranteed value of {guaranteed_pct} is at or above par"
            ),
            BreakEvenResult::Level { level, note } => match note {
                Some(n) => format!("Break-even at {} of reference ({n})", level.round_dp(4)),
                None => format!("Break-even at {} of reference", level.round_dp(4)),
            },
            BreakEvenResult::Impossible { reason } => {
                format!("Break-even not reachable: {reason}")
            }
            BreakEvenResult::KnockInConditional {
                protected_break_even,
                par_protected,
                note,
                ..
            } => {
                let head = match (par_protected, protected_break_even) {
                    (true, _) => "Par protected above the knock-in".to_string(),
                    (false, Some(l)) => format!(
                        "Break-even at {} while the knock-in is not triggered",
                        l.round_dp(4)
                    ),
                    (false, None) => {
                        "Break-even not reachable while the knock-in is not triggered".to_string()
                    }
                };
                format!("{head}; {note}")
            }
            BreakEvenResult::BonusConditional {
                bonus_level,
                surviving_break_even,
                par_protected,
                note,
                ..
            } => {
                let head = match (par_protected, surviving_break_even) {
                    (true, _) => format!("Bonus of {bonus_level} guaranteed while the barrier holds"),
                    (false, Some(l)) => format!(
                        "Break-even at {} while the barrier holds",
                        l.round_dp(4)
                    ),
                    (false, None) => {
                        "Break-even not reachable while the barrier holds".to_string()
                    }
                };
                format!("{head}; {note}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Income notes
// ---------------------------------------------------------------------------

/// Closed form: `100 * L / strike * ratio + coupons = 100`.
fn solve_income(terms: &IncomeNoteTerms, tenor_months: u32) -> BreakEvenResult {
    let coupons = total_coupon_pct(terms, tenor_months);
    if coupons >= Percent::HUNDRED {
        return BreakEvenResult::Always {
            guaranteed_pct: coupons,
        };
    }
    let strike = terms.conversion_strike();
    let Some(level) = (strike.value() * (Percent::HUNDRED - coupons).value())
        .checked_div(Decimal::ONE_HUNDRED * terms.conversion_ratio)
        .map(Percent::new)
    else {
        return BreakEvenResult::Impossible {
            reason: format!(
                "conversion ratio {} is too small to restore par within decimal range",
                terms.conversion_ratio
            ),
        };
    };

    let note = if level >= terms.barrier {
        warn!(%level, barrier = %terms.barrier, "conversion break-even above barrier");
        Some(format!(
            "applies on conversion only: the note redeems at par down to the {} barrier \
             and total return below it is already negative",
            terms.barrier
        ))
    } else {
        None
    };

    BreakEvenResult::Level { level, note }
}

// ---------------------------------------------------------------------------
// Protection notes
// ---------------------------------------------------------------------------

/// Invert `100 = P + a * max(0, ±(X - K))` for the plain participation leg.
fn solve_participation(terms: &ProtectionNoteTerms) -> BreakEvenResult {
    let floor = terms.protection_floor;
    if floor >= Percent::HUNDRED {
        return BreakEvenResult::Always {
            guaranteed_pct: floor,
        };
    }

    let a = terms.participation_rate.as_fraction();
    if a <= Decimal::ZERO {
        return BreakEvenResult::Impossible {
            reason: format!(
                "participation rate is zero, so redemption never rises above the {floor} floor"
            ),
        };
    }

    if let Some(max) = max_participation_payoff(terms) {
        if max < Percent::HUNDRED {
            return BreakEvenResult::Impossible {
                reason: format!(
                    "maximum redemption at the cap is {}, below par",
                    max.round_dp(4)
                ),
            };
        }
    }

    let k = terms.participation_start;
    let Some(distance) = (Percent::HUNDRED - floor)
        .value()
        .checked_div(a)
        .map(Percent::new)
    else {
        return BreakEvenResult::Impossible {
            reason: format!(
                "participation rate {} is too small to restore par within decimal range",
                terms.participation_rate
            ),
        };
    };
    let level = match terms.direction {
        ParticipationDirection::Up => k + distance,
        ParticipationDirection::Down => k - distance,
    };

    if terms.direction == ParticipationDirection::Down && !level.is_positive() {
        return BreakEvenResult::Impossible {
            reason: format!(
                "downward participation would need a level of {}, outside (0, {k}]",
                level.round_dp(4)
            ),
        };
    }

    BreakEvenResult::Level { level, note: None }
}

fn solve_protection(terms: &ProtectionNoteTerms) -> BreakEvenResult {
    let plain = solve_participation(terms);

    if let Some(bonus) = &terms.bonus {
        let par_protected = bonus.bonus_level >= Percent::HUNDRED;
        let surviving_break_even = match plain {
            BreakEvenResult::Level { level, .. } if !par_protected && level >= bonus.bonus_barrier => {
                Some(level)
            }
            _ => None,
        };
        return BreakEvenResult::BonusConditional {
            bonus_level: bonus.bonus_level,
            bonus_barrier: bonus.bonus_barrier,
            surviving_break_even,
            par_protected,
            breached_break_even: Percent::HUNDRED,
            note: format!(
                "below the {} barrier the note tracks the underlying 1:1 and breaks even only at 100%",
                bonus.bonus_barrier
            ),
        };
    }

    if let Some(ki) = &terms.knock_in {
        let strike = ki.effective_strike();
        let (protected_break_even, par_protected) = match plain {
            BreakEvenResult::Always { .. } => (None, true),
            BreakEvenResult::Level { level, .. } if level >= ki.level => (Some(level), false),
            _ => (None, false),
        };
        let knocked_in_break_even = (strike < ki.level).then_some(strike);
        return BreakEvenResult::KnockInConditional {
            knock_in_level: ki.level,
            downside_strike: strike,
            protected_break_even,
            par_protected,
            knocked_in_break_even,
            note: format!(
                "below the {} knock-in protection is lost and redemption is 100 x level / {}",
                ki.level, strike
            ),
        };
    }

    plain
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn solve_break_even(terms: &ProductTerms) -> PayoffResult<BreakEvenResult> {
    terms.validate()?;
    let result = match &terms.product {
        ProductFamily::IncomeNote(t) => solve_income(t, terms.tenor_months),
        ProductFamily::ProtectionNote(t) => solve_protection(t),
    };
    debug!(?result, "break-even solved");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::{accrued_income, payoff_pct};
    use crate::terms::{
        BasketSpec, BonusOverlay, CapType, IncomeVariant, KnockIn, Underlying,
    };
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn pct(v: Decimal) -> Percent {
        Percent::new(v)
    }

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn wrap(product: ProductFamily) -> ProductTerms {
        ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            BasketSpec::single(Underlying {
                ticker: "SX5E".into(),
                initial_fixing: dec!(4800),
                spot: None,
            }),
            product,
        )
        .unwrap()
    }

    fn income(variant: IncomeVariant, barrier: Decimal, strike: Option<Decimal>) -> ProductTerms {
        wrap(ProductFamily::IncomeNote(IncomeNoteTerms {
            variant,
            barrier: pct(barrier),
            strike: strike.map(pct),
            coupon_rate_pa: pct(dec!(8)),
            coupon_frequency: 4,
            conversion_ratio: Decimal::ONE,
            autocall_level: None,
        }))
    }

    fn cppn(floor: Decimal, rate: Decimal, cap: Option<Decimal>) -> ProtectionNoteTerms {
        ProtectionNoteTerms {
            protection_floor: pct(floor),
            participation_start: pct(dec!(100)),
            participation_rate: pct(rate),
            direction: ParticipationDirection::Up,
            cap_type: if cap.is_some() {
                CapType::Capped
            } else {
                CapType::None
            },
            cap_level: cap.map(pct),
            knock_in: None,
            bonus: None,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Standard barrier RC: 8% coupons => 92%
    // -----------------------------------------------------------------------
    #[test]
    fn test_standard_barrier_break_even() {
        let terms = income(IncomeVariant::StandardBarrier, dec!(70), None);
        let result = solve_break_even(&terms).unwrap();
        assert_eq!(result.require_level().unwrap(), pct(dec!(92)));
        // 70% barrier sits below the 92% conversion break-even
        match result {
            BreakEvenResult::Level { note, .. } => assert!(note.is_some()),
            other => panic!("Expected Level, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // 2. Geared put: 55 x 0.92 = 50.6
    // -----------------------------------------------------------------------
    #[test]
    fn test_geared_put_break_even() {
        let terms = income(IncomeVariant::LowStrikeGearedPut, dec!(55), Some(dec!(55)));
        let result = solve_break_even(&terms).unwrap();
        assert_eq!(
            result,
            BreakEvenResult::Level {
                level: pct(dec!(50.6)),
                note: None
            }
        );
    }

    #[test]
    fn test_income_round_trip_below_barrier() {
        let terms = income(IncomeVariant::LowStrikeGearedPut, dec!(60), Some(dec!(55)));
        let level = solve_break_even(&terms).unwrap().require_level().unwrap();
        let total = payoff_pct(&terms, level).unwrap() + accrued_income(&terms);
        assert!(
            approx_eq(total.value(), dec!(100), dec!(0.000001)),
            "total at break-even should be par, got {total}"
        );
    }

    #[test]
    fn test_conversion_ratio_divides_break_even() {
        let mut terms = income(IncomeVariant::LowStrikeGearedPut, dec!(70), Some(dec!(55)));
        if let ProductFamily::IncomeNote(t) = &mut terms.product {
            t.conversion_ratio = dec!(0.8);
        }
        // 55 * 92 / (100 * 0.8)
        let level = solve_break_even(&terms).unwrap().require_level().unwrap();
        assert_eq!(level, pct(dec!(63.25)));
        let total = payoff_pct(&terms, level).unwrap() + accrued_income(&terms);
        assert!(
            approx_eq(total.value(), dec!(100), dec!(0.000001)),
            "total at break-even should be par, got {total}"
        );
    }

    #[test]
    fn test_coupons_above_par_always_break_even() {
        let mut terms = income(IncomeVariant::StandardBarrier, dec!(70), None);
        terms.tenor_months = 60;
        if let ProductFamily::IncomeNote(t) = &mut terms.product {
            t.coupon_rate_pa = pct(dec!(25));
        }
        let result = solve_break_even(&terms).unwrap();
        assert_eq!(
            result,
            BreakEvenResult::Always {
                guaranteed_pct: pct(dec!(125))
            }
        );
    }

    // -----------------------------------------------------------------------
    // 3. CPPN 100% floor => always
    // -----------------------------------------------------------------------
    #[test]
    fn test_full_protection_always() {
        let terms = wrap(ProductFamily::ProtectionNote(cppn(dec!(100), dec!(120), None)));
        let result = solve_break_even(&terms).unwrap();
        assert!(matches!(result, BreakEvenResult::Always { .. }));
        assert!(result.require_level().is_err());
    }

    // -----------------------------------------------------------------------
    // 4. CPPN 90% floor, 50% participation, cap 130 => 120
    // -----------------------------------------------------------------------
    #[test]
    fn test_capped_cppn_break_even() {
        let terms = wrap(ProductFamily::ProtectionNote(cppn(
            dec!(90),
            dec!(50),
            Some(dec!(130)),
        )));
        let level = solve_break_even(&terms).unwrap().require_level().unwrap();
        assert_eq!(level, pct(dec!(120)));
        assert_eq!(payoff_pct(&terms, level).unwrap(), Percent::HUNDRED);
    }

    #[test]
    fn test_cap_too_low_is_impossible() {
        let terms = wrap(ProductFamily::ProtectionNote(cppn(
            dec!(90),
            dec!(50),
            Some(dec!(115)),
        )));
        let result = solve_break_even(&terms).unwrap();
        assert!(!result.is_reachable());
        assert!(result.summary().starts_with("Break-even not reachable"));
        match result.require_level().unwrap_err() {
            PayoffError::Unsolvable(msg) => assert!(msg.contains("97.5")),
            other => panic!("Expected Unsolvable, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_participation_is_impossible() {
        let terms = wrap(ProductFamily::ProtectionNote(cppn(dec!(95), dec!(0), None)));
        assert!(matches!(
            solve_break_even(&terms).unwrap(),
            BreakEvenResult::Impossible { .. }
        ));
    }

    #[test]
    fn test_downward_break_even_and_domain_check() {
        let mut p = cppn(dec!(90), dec!(100), None);
        p.direction = ParticipationDirection::Down;
        let terms = wrap(ProductFamily::ProtectionNote(p.clone()));
        assert_eq!(
            solve_break_even(&terms).unwrap().require_level().unwrap(),
            pct(dec!(90))
        );

        // (100 - 10) / 0.05 = 1800 below a 100 start: negative level
        p.protection_floor = pct(dec!(10));
        p.participation_rate = pct(dec!(5));
        let terms = wrap(ProductFamily::ProtectionNote(p));
        assert!(matches!(
            solve_break_even(&terms).unwrap(),
            BreakEvenResult::Impossible { .. }
        ));
    }

    #[test]
    fn test_knock_in_conditional() {
        let mut p = cppn(dec!(90), dec!(50), None);
        p.knock_in = Some(KnockIn {
            level: pct(dec!(60)),
            downside_strike: Some(pct(dec!(80))),
        });
        let terms = wrap(ProductFamily::ProtectionNote(p));
        match solve_break_even(&terms).unwrap() {
            BreakEvenResult::KnockInConditional {
                protected_break_even,
                par_protected,
                knocked_in_break_even,
                downside_strike,
                ..
            } => {
                assert_eq!(protected_break_even, Some(pct(dec!(120))));
                assert!(!par_protected);
                assert_eq!(knocked_in_break_even, None);
                assert_eq!(downside_strike, pct(dec!(80)));
            }
            other => panic!("Expected KnockInConditional, got {other:?}"),
        }
    }

    #[test]
    fn test_knocked_in_break_even_at_downside_strike() {
        let mut p = cppn(dec!(90), dec!(50), None);
        p.knock_in = Some(KnockIn {
            level: pct(dec!(60)),
            downside_strike: Some(pct(dec!(50))),
        });
        let terms = wrap(ProductFamily::ProtectionNote(p));
        match solve_break_even(&terms).unwrap() {
            BreakEvenResult::KnockInConditional {
                protected_break_even,
                knocked_in_break_even,
                ..
            } => {
                assert_eq!(knocked_in_break_even, Some(pct(dec!(50))));
                assert_eq!(protected_break_even, Some(pct(dec!(120))));
                assert_eq!(payoff_pct(&terms, pct(dec!(50))).unwrap(), Percent::HUNDRED);
                assert_eq!(payoff_pct(&terms, pct(dec!(120))).unwrap(), Percent::HUNDRED);
            }
            other => panic!("Expected KnockInConditional, got {other:?}"),
        }
    }

    #[test]
    fn test_bonus_below_par_has_surviving_break_even() {
        let mut p = cppn(dec!(80), dec!(100), None);
        p.bonus = Some(BonusOverlay {
            bonus_level: pct(dec!(95)),
            bonus_barrier: pct(dec!(70)),
        });
        let terms = wrap(ProductFamily::ProtectionNote(p));
        let result = solve_break_even(&terms).unwrap();
        match &result {
            BreakEvenResult::BonusConditional {
                surviving_break_even,
                par_protected,
                ..
            } => {
                assert!(!par_protected);
                // 100 + (100 - 80) / 1.0
                assert_eq!(*surviving_break_even, Some(pct(dec!(120))));
                assert_eq!(payoff_pct(&terms, pct(dec!(120))).unwrap(), Percent::HUNDRED);
            }
            other => panic!("Expected BonusConditional, got {other:?}"),
        }
        assert!(result.summary().starts_with("Break-even at 120"));
    }

    #[test]
    fn test_vanishing_participation_is_impossible_not_overflowed() {
        let terms = wrap(ProductFamily::ProtectionNote(cppn(
            dec!(90),
            dec!(0.00000000000000000000000001),
            None,
        )));
        assert!(matches!(
            solve_break_even(&terms).unwrap(),
            BreakEvenResult::Impossible { .. }
        ));
    }

    #[test]
    fn test_bonus_conditional() {
        let mut p = cppn(dec!(100), dec!(100), None);
        p.bonus = Some(BonusOverlay {
            bonus_level: pct(dec!(108)),
            bonus_barrier: pct(dec!(65)),
        });
        let terms = wrap(ProductFamily::ProtectionNote(p));
        let result = solve_break_even(&terms).unwrap();
        match &result {
            BreakEvenResult::BonusConditional {
                bonus_level,
                par_protected,
                breached_break_even,
                ..
            } => {
                assert_eq!(*bonus_level, pct(dec!(108)));
                assert!(par_protected);
                assert_eq!(*breached_break_even, Percent::HUNDRED);
            }
            other => panic!("Expected BonusConditional, got {other:?}"),
        }
        assert!(result.summary().contains("108%"));
    }

    #[test]
    fn test_serialises_with_kind_tag() {
        let v = serde_json::to_value(BreakEvenResult::Impossible {
            reason: "cap".into(),
        })
        .unwrap();
        assert_eq!(v["kind"], "impossible");
    }
}
