pub mod basket;
pub mod breakeven;
pub mod error;
pub mod landmarks;
pub mod payoff;
pub mod terms;
pub mod types;

#[cfg(feature = "curve")]
pub mod curve;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use basket::{resolve_basket, resolve_basket_spec};
pub use breakeven::{solve_break_even, BreakEvenResult};
pub use error::PayoffError;
pub use payoff::{evaluate_payoff, payoff_pct};
pub use terms::ProductTerms;
pub use types::*;

#[cfg(feature = "curve")]
pub use curve::generate_curve;

#[cfg(feature = "scenarios")]
pub use scenarios::build_scenario_table;

/// Standard result type for all payoff-engine operations
pub type PayoffResult<T> = Result<T, PayoffError>;
