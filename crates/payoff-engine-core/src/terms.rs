use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PayoffError;
use crate::types::{Currency, Money, Percent};
use crate::PayoffResult;

/// Longest tenor accepted; keeps coupon period counts well inside `u32`.
pub const MAX_TENOR_MONTHS: u32 = 600;

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

/// One traded asset reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Underlying {
    pub ticker: String,
    /// Reference price at trade date.
    pub initial_fixing: Money,
    /// Current price, when a market snapshot is available.
    #[serde(default)]
    pub spot: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasketRule {
    Single,
    WorstOf,
    BestOf,
    Average,
}

impl std::fmt::Display for BasketRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasketRule::Single => write!(f, "Single underlying"),
            BasketRule::WorstOf => write!(f, "Worst-of"),
            BasketRule::BestOf => write!(f, "Best-of"),
            BasketRule::Average => write!(f, "Equal-weight average"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketSpec {
    pub rule: BasketRule,
    pub underlyings: Vec<Underlying>,
}

impl BasketSpec {
    pub fn single(underlying: Underlying) -> Self {
        BasketSpec {
            rule: BasketRule::Single,
            underlyings: vec![underlying],
        }
    }

    pub fn validate(&self) -> PayoffResult<()> {
        if self.underlyings.is_empty() {
            return Err(PayoffError::invalid(
                "basket.underlyings",
                "basket must contain at least one underlying",
            ));
        }
        if self.rule == BasketRule::Single && self.underlyings.len() != 1 {
            return Err(PayoffError::invalid(
                "basket.underlyings",
                format!(
                    "single basket requires exactly one underlying, got {}",
                    self.underlyings.len()
                ),
            ));
        }
        for (i, u) in self.underlyings.iter().enumerate() {
            if u.initial_fixing <= Decimal::ZERO {
                return Err(PayoffError::invalid(
                    format!("basket.underlyings[{i}].initial_fixing"),
                    format!("initial fixing for {} must be positive", u.ticker),
                ));
            }
            if let Some(spot) = u.spot {
                if spot < Decimal::ZERO {
                    return Err(PayoffError::invalid(
                        format!("basket.underlyings[{i}].spot"),
                        format!("spot for {} cannot be negative", u.ticker),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Income-note family (reverse convertibles)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeVariant {
    StandardBarrier,
    LowStrikeGearedPut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeNoteTerms {
    pub variant: IncomeVariant,
    /// European barrier, checked at maturity only.
    pub barrier: Percent,
    /// Conversion strike for the geared-put variant. The standard variant
    /// always converts at the reference level (100).
    #[serde(default)]
    pub strike: Option<Percent>,
    pub coupon_rate_pa: Percent,
    pub coupon_frequency: u32,
    #[serde(default = "default_conversion_ratio")]
    pub conversion_ratio: Decimal,
    #[serde(default)]
    pub autocall_level: Option<Percent>,
}

fn default_conversion_ratio() -> Decimal {
    Decimal::ONE
}

impl IncomeNoteTerms {
    /// Level at which delivered shares are priced.
    pub fn conversion_strike(&self) -> Percent {
        match self.variant {
            IncomeVariant::StandardBarrier => Percent::HUNDRED,
            IncomeVariant::LowStrikeGearedPut => self.strike.unwrap_or(self.barrier),
        }
    }

    fn validate(&self) -> PayoffResult<()> {
        if !self.barrier.is_positive() || self.barrier > Percent::HUNDRED {
            return Err(PayoffError::invalid(
                "barrier",
                "must be in (0, 100] percent of reference",
            ));
        }
        match (self.variant, self.strike) {
            (IncomeVariant::LowStrikeGearedPut, None) => {
                return Err(PayoffError::invalid(
                    "strike",
                    "required for low_strike_geared_put notes",
                ));
            }
            (_, Some(k)) if !k.is_positive() => {
                return Err(PayoffError::invalid("strike", "must be positive"));
            }
            _ => {}
        }
        if self.coupon_rate_pa.is_negative() {
            return Err(PayoffError::invalid("coupon_rate_pa", "cannot be negative"));
        }
        if self.coupon_rate_pa.is_positive() && self.coupon_frequency == 0 {
            return Err(PayoffError::invalid(
                "coupon_frequency",
                "must be at least 1 when a coupon is paid",
            ));
        }
        if self.coupon_frequency > 12 {
            return Err(PayoffError::invalid(
                "coupon_frequency",
                "at most monthly (12 per year) is supported",
            ));
        }
        if self.conversion_ratio <= Decimal::ZERO {
            return Err(PayoffError::invalid("conversion_ratio", "must be positive"));
        }
        if let Some(ac) = self.autocall_level {
            if ac <= self.barrier {
                return Err(PayoffError::invalid(
                    "autocall_level",
                    format!("must lie above the barrier ({})", self.barrier),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Protection-note family (capital-protected participation / bonus)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapType {
    #[default]
    None,
    Capped,
}

/// Below `level` the protected payoff is replaced by `100 * level / downside_strike`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnockIn {
    pub level: Percent,
    /// Defaults to the knock-in level.
    #[serde(default)]
    pub downside_strike: Option<Percent>,
}

impl KnockIn {
    pub fn effective_strike(&self) -> Percent {
        self.downside_strike.unwrap_or(self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusOverlay {
    pub bonus_level: Percent,
    pub bonus_barrier: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionNoteTerms {
    pub protection_floor: Percent,
    pub participation_start: Percent,
    pub participation_rate: Percent,
    pub direction: ParticipationDirection,
    #[serde(default)]
    pub cap_type: CapType,
    #[serde(default)]
    pub cap_level: Option<Percent>,
    #[serde(default)]
    pub knock_in: Option<KnockIn>,
    #[serde(default)]
    pub bonus: Option<BonusOverlay>,
}

impl ProtectionNoteTerms {
    /// Cap level when the note is capped.
    pub fn active_cap(&self) -> Option<Percent> {
        match self.cap_type {
            CapType::Capped => self.cap_level,
            CapType::None => None,
        }
    }

    fn validate(&self) -> PayoffResult<()> {
        if self.knock_in.is_some() && self.bonus.is_some() {
            return Err(PayoffError::DomainAmbiguous(
                "knock-in and bonus overlays cannot both be active on one note".into(),
            ));
        }
        if self.protection_floor.is_negative() {
            return Err(PayoffError::invalid("protection_floor", "cannot be negative"));
        }
        if !self.participation_start.is_positive() {
            return Err(PayoffError::invalid("participation_start", "must be positive"));
        }
        if self.participation_rate.is_negative() {
            return Err(PayoffError::invalid(
                "participation_rate",
                "cannot be negative",
            ));
        }
        if self.cap_type == CapType::Capped {
            let cap = self.cap_level.ok_or_else(|| {
                PayoffError::invalid("cap_level", "required when cap_type is capped")
            })?;
            let k = self.participation_start;
            match self.direction {
                ParticipationDirection::Up if cap <= k => {
                    return Err(PayoffError::invalid(
                        "cap_level",
                        format!("must lie above the participation start ({k}) for upward notes"),
                    ));
                }
                ParticipationDirection::Down if cap >= k || cap.is_negative() => {
                    return Err(PayoffError::invalid(
                        "cap_level",
                        format!(
                            "must lie in [0, {k}) below the participation start for downward notes"
                        ),
                    ));
                }
                _ => {}
            }
        }
        if let Some(ki) = &self.knock_in {
            if !ki.level.is_positive() {
                return Err(PayoffError::invalid("knock_in.level", "must be positive"));
            }
            if !ki.effective_strike().is_positive() {
                return Err(PayoffError::invalid(
                    "knock_in.downside_strike",
                    "must be positive",
                ));
            }
        }
        if let Some(bonus) = &self.bonus {
            if bonus.bonus_level < self.protection_floor {
                return Err(PayoffError::invalid(
                    "bonus.bonus_level",
                    format!(
                        "must be at least the protection floor ({})",
                        self.protection_floor
                    ),
                ));
            }
            if !bonus.bonus_barrier.is_positive() {
                return Err(PayoffError::invalid(
                    "bonus.bonus_barrier",
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Product terms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ProductFamily {
    IncomeNote(IncomeNoteTerms),
    ProtectionNote(ProtectionNoteTerms),
}

/// Fully specified contract description.
///
/// Terms are plain data so they can be deserialised from report requests;
/// every public engine entry point re-runs [`ProductTerms::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTerms {
    pub notional: Money,
    pub tenor_months: u32,
    #[serde(default)]
    pub currency: Currency,
    pub basket: BasketSpec,
    #[serde(default)]
    pub trade_date: Option<NaiveDate>,
    pub product: ProductFamily,
}

impl ProductTerms {
    pub fn new(
        notional: Money,
        tenor_months: u32,
        currency: Currency,
        basket: BasketSpec,
        product: ProductFamily,
    ) -> PayoffResult<Self> {
        let terms = ProductTerms {
            notional,
            tenor_months,
            currency,
            basket,
            trade_date: None,
            product,
        };
        terms.validate()?;
        Ok(terms)
    }

    pub fn with_trade_date(mut self, trade_date: NaiveDate) -> Self {
        self.trade_date = Some(trade_date);
        self
    }

    pub fn validate(&self) -> PayoffResult<()> {
        if self.notional <= Decimal::ZERO {
            return Err(PayoffError::invalid("notional", "must be positive"));
        }
        if self.tenor_months == 0 {
            return Err(PayoffError::invalid("tenor_months", "must be at least 1"));
        }
        if self.tenor_months > MAX_TENOR_MONTHS {
            return Err(PayoffError::invalid(
                "tenor_months",
                format!("at most {MAX_TENOR_MONTHS} months (50 years) is supported"),
            ));
        }
        self.basket.validate()?;
        match &self.product {
            ProductFamily::IncomeNote(t) => t.validate(),
            ProductFamily::ProtectionNote(t) => t.validate(),
        }
    }

    pub fn product_name(&self) -> String {
        match &self.product {
            ProductFamily::IncomeNote(t) => match t.variant {
                IncomeVariant::StandardBarrier => "Barrier Reverse Convertible".into(),
                IncomeVariant::LowStrikeGearedPut => "Low-Strike Geared Put Reverse Convertible".into(),
            },
            ProductFamily::ProtectionNote(t) => {
                if t.bonus.is_some() {
                    "Bonus Certificate".into()
                } else if t.knock_in.is_some() {
                    "Capital-Protected Note with Knock-In".into()
                } else {
                    "Capital-Protected Participation Note".into()
                }
            }
        }
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.trade_date
            .and_then(|d| d.checked_add_months(Months::new(self.tenor_months)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pct(v: Decimal) -> Percent {
        Percent::new(v)
    }

    fn spx() -> BasketSpec {
        BasketSpec::single(Underlying {
            ticker: "SPX".into(),
            initial_fixing: dec!(5000),
            spot: None,
        })
    }

    fn cppn() -> ProtectionNoteTerms {
        ProtectionNoteTerms {
            protection_floor: pct(dec!(90)),
            participation_start: pct(dec!(100)),
            participation_rate: pct(dec!(50)),
            direction: ParticipationDirection::Up,
            cap_type: CapType::Capped,
            cap_level: Some(pct(dec!(130))),
            knock_in: None,
            bonus: None,
        }
    }

    #[test]
    fn test_valid_terms_construct() {
        let terms = ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(cppn()),
        );
        assert!(terms.is_ok());
    }

    #[test]
    fn test_cap_below_start_rejected_for_upward_note() {
        let mut p = cppn();
        p.cap_level = Some(pct(dec!(95)));
        let err = ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(p),
        )
        .unwrap_err();
        match err {
            PayoffError::InvalidInput { field, .. } => assert_eq!(field, "cap_level"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_capped_without_level_rejected() {
        let mut p = cppn();
        p.cap_level = None;
        let result = ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(p),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bonus_and_knock_in_is_ambiguous() {
        let mut p = cppn();
        p.knock_in = Some(KnockIn {
            level: pct(dec!(60)),
            downside_strike: None,
        });
        p.bonus = Some(BonusOverlay {
            bonus_level: pct(dec!(108)),
            bonus_barrier: pct(dec!(65)),
        });
        let err = ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(p),
        )
        .unwrap_err();
        assert!(matches!(err, PayoffError::DomainAmbiguous(_)));
    }

    #[test]
    fn test_bonus_below_floor_rejected() {
        let mut p = cppn();
        p.bonus = Some(BonusOverlay {
            bonus_level: pct(dec!(85)),
            bonus_barrier: pct(dec!(65)),
        });
        assert!(ProductTerms::new(
            dec!(100000),
            12,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(p),
        )
        .is_err());
    }

    #[test]
    fn test_single_basket_requires_one_underlying() {
        let mut basket = spx();
        basket.underlyings.push(Underlying {
            ticker: "NDX".into(),
            initial_fixing: dec!(18000),
            spot: None,
        });
        assert!(basket.validate().is_err());
        basket.rule = BasketRule::WorstOf;
        assert!(basket.validate().is_ok());
    }

    #[test]
    fn test_geared_put_requires_strike() {
        let income = IncomeNoteTerms {
            variant: IncomeVariant::LowStrikeGearedPut,
            barrier: pct(dec!(55)),
            strike: None,
            coupon_rate_pa: pct(dec!(8)),
            coupon_frequency: 4,
            conversion_ratio: Decimal::ONE,
            autocall_level: None,
        };
        assert!(income.validate().is_err());
    }

    #[test]
    fn test_coupon_without_frequency_rejected() {
        let income = IncomeNoteTerms {
            variant: IncomeVariant::StandardBarrier,
            barrier: pct(dec!(70)),
            strike: None,
            coupon_rate_pa: pct(dec!(8)),
            coupon_frequency: 0,
            conversion_ratio: Decimal::ONE,
            autocall_level: None,
        };
        assert!(income.validate().is_err());
    }

    #[test]
    fn test_coupon_frequency_above_monthly_rejected() {
        let income = IncomeNoteTerms {
            variant: IncomeVariant::StandardBarrier,
            barrier: pct(dec!(70)),
            strike: None,
            coupon_rate_pa: pct(dec!(8)),
            coupon_frequency: 52,
            conversion_ratio: Decimal::ONE,
            autocall_level: None,
        };
        match income.validate().unwrap_err() {
            PayoffError::InvalidInput { field, .. } => assert_eq!(field, "coupon_frequency"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tenor_above_ceiling_rejected() {
        let err = ProductTerms::new(
            dec!(100000),
            u32::MAX,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(cppn()),
        )
        .unwrap_err();
        match err {
            PayoffError::InvalidInput { field, .. } => assert_eq!(field, "tenor_months"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
        assert!(ProductTerms::new(
            dec!(100000),
            MAX_TENOR_MONTHS,
            Currency::USD,
            spx(),
            ProductFamily::ProtectionNote(cppn()),
        )
        .is_ok());
    }

    #[test]
    fn test_maturity_date_from_trade_date() {
        let terms = ProductTerms::new(
            dec!(100000),
            18,
            Currency::EUR,
            spx(),
            ProductFamily::ProtectionNote(cppn()),
        )
        .unwrap()
        .with_trade_date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(
            terms.maturity_date(),
            NaiveDate::from_ymd_opt(2026, 7, 31)
        );
    }

    #[test]
    fn test_deserialise_from_json() {
        let json = r#"{
            "notional": "250000",
            "tenor_months": 12,
            "currency": "CHF",
            "basket": {
                "rule": "worst_of",
                "underlyings": [
                    {"ticker": "NESN", "initial_fixing": "100"},
                    {"ticker": "ROG", "initial_fixing": "250", "spot": "240"}
                ]
            },
            "product": {
                "family": "income_note",
                "variant": "standard_barrier",
                "barrier": "70",
                "coupon_rate_pa": "8",
                "coupon_frequency": 4
            }
        }"#;
        let terms: ProductTerms = serde_json::from_str(json).unwrap();
        assert!(terms.validate().is_ok());
        assert_eq!(terms.basket.rule, BasketRule::WorstOf);
        match terms.product {
            ProductFamily::IncomeNote(t) => {
                assert_eq!(t.conversion_ratio, Decimal::ONE);
                assert_eq!(t.conversion_strike(), Percent::HUNDRED);
            }
            other => panic!("Expected income note, got {other:?}"),
        }
    }
}
