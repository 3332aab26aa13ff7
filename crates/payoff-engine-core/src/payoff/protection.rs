use rust_decimal::Decimal;

use super::PayoffRegime;
use crate::terms::{ParticipationDirection, ProtectionNoteTerms};
use crate::types::Percent;

/// Redemption of a protection note at `level`.
///
/// Overlay precedence: bonus, then knock-in, then plain capped participation.
/// Validation guarantees at most one overlay is set.
pub(crate) fn redemption(terms: &ProtectionNoteTerms, level: Percent) -> (Percent, PayoffRegime) {
    if let Some(bonus) = &terms.bonus {
        if level < bonus.bonus_barrier {
            return (level, PayoffRegime::BonusBreached);
        }
        let (base, regime) = participation(terms, level);
        if bonus.bonus_level >= base {
            return (bonus.bonus_level, PayoffRegime::BonusFloor);
        }
        return (base, regime);
    }

    if let Some(ki) = &terms.knock_in {
        if level < ki.level {
            let strike = ki.effective_strike();
            let knocked = Percent::new(Decimal::ONE_HUNDRED * level.value() / strike.value());
            return (knocked, PayoffRegime::KnockedIn);
        }
    }

    participation(terms, level)
}

/// `max(P, P + a * clamped_delta)`.
pub(crate) fn participation(terms: &ProtectionNoteTerms, level: Percent) -> (Percent, PayoffRegime) {
    let k = terms.participation_start;
    let raw = match terms.direction {
        ParticipationDirection::Up => level - k,
        ParticipationDirection::Down => k - level,
    }
    .max(Percent::ZERO);

    let mut regime = if raw.is_positive() {
        PayoffRegime::Participation
    } else {
        PayoffRegime::ProtectedFloor
    };

    let delta = match max_delta(terms) {
        Some(limit) if raw >= limit => {
            regime = PayoffRegime::Capped;
            limit
        }
        _ => raw,
    };

    let p = terms.protection_floor;
    let uplift = delta * terms.participation_rate.as_fraction();
    ((p + uplift).max(p), regime)
}

/// Largest participating distance from the start level, when capped.
pub(crate) fn max_delta(terms: &ProtectionNoteTerms) -> Option<Percent> {
    terms
        .active_cap()
        .map(|cap| (cap - terms.participation_start).abs().max(Percent::ZERO))
}

/// Highest redemption the participation leg can reach, `None` when uncapped.
pub(crate) fn max_participation_payoff(terms: &ProtectionNoteTerms) -> Option<Percent> {
    max_delta(terms).map(|d| terms.protection_floor + d * terms.participation_rate.as_fraction())
}
