use serde::{Deserialize, Serialize};

use crate::breakeven::{solve_break_even, BreakEvenResult};
use crate::terms::{IncomeVariant, ProductFamily, ProductTerms};
use crate::types::Percent;
use crate::PayoffResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    Barrier,
    Strike,
    Autocall,
    ParticipationStart,
    Cap,
    KnockIn,
    DownsideStrike,
    BonusBarrier,
    BreakEven,
}

impl LandmarkKind {
    /// The payoff jumps at this level.
    pub fn is_discontinuity(self) -> bool {
        matches!(
            self,
            LandmarkKind::Barrier | LandmarkKind::KnockIn | LandmarkKind::BonusBarrier
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    pub kind: LandmarkKind,
    pub level: Percent,
}

/// Key levels of the payoff, sorted ascending.
pub fn landmarks(terms: &ProductTerms) -> PayoffResult<Vec<Landmark>> {
    let break_even = solve_break_even(terms)?;
    let mut marks = Vec::new();
    let mut push = |kind, level| marks.push(Landmark { kind, level });

    match &terms.product {
        ProductFamily::IncomeNote(t) => {
            push(LandmarkKind::Barrier, t.barrier);
            if t.variant == IncomeVariant::LowStrikeGearedPut {
                push(LandmarkKind::Strike, t.conversion_strike());
            }
            if let Some(ac) = t.autocall_level {
                push(LandmarkKind::Autocall, ac);
            }
        }
        ProductFamily::ProtectionNote(t) => {
            push(LandmarkKind::ParticipationStart, t.participation_start);
            if let Some(cap) = t.active_cap() {
                push(LandmarkKind::Cap, cap);
            }
            if let Some(ki) = &t.knock_in {
                push(LandmarkKind::KnockIn, ki.level);
                if ki.effective_strike() != ki.level {
                    push(LandmarkKind::DownsideStrike, ki.effective_strike());
                }
            }
            if let Some(bonus) = &t.bonus {
                push(LandmarkKind::BonusBarrier, bonus.bonus_barrier);
            }
        }
    }

    for level in break_even_levels(&break_even) {
        push(LandmarkKind::BreakEven, level);
    }

    marks.sort_by(|a, b| a.level.cmp(&b.level));
    Ok(marks)
}

fn break_even_levels(result: &BreakEvenResult) -> Vec<Percent> {
    match result {
        BreakEvenResult::Level { level, .. } => vec![*level],
        BreakEvenResult::KnockInConditional {
            protected_break_even,
            knocked_in_break_even,
            ..
        } => protected_break_even
            .iter()
            .chain(knocked_in_break_even.iter())
            .copied()
            .collect(),
        BreakEvenResult::BonusConditional {
            surviving_break_even,
            ..
        } => surviving_break_even.iter().copied().collect(),
        BreakEvenResult::Always { .. } | BreakEvenResult::Impossible { .. } => Vec::new(),
    }
}
