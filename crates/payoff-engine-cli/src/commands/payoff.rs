use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use payoff_engine_core::breakeven;
use payoff_engine_core::curve::{self, CurveConfig};
use payoff_engine_core::payoff;
use payoff_engine_core::scenarios;
use payoff_engine_core::terms::ProductTerms;
use payoff_engine_core::Percent;

use crate::input;

/// Arguments for a single payoff evaluation
#[derive(Args)]
pub struct PayoffArgs {
    /// Path to a product terms file
    #[arg(long)]
    pub input: Option<String>,

    /// Settlement level in percent of reference (e.g. 87.5)
    #[arg(long)]
    pub level: Option<Decimal>,

    /// Evaluate at the basket level implied by the spots in the terms
    #[arg(long, conflicts_with = "level")]
    pub market: bool,
}

/// Arguments for break-even solving
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to a product terms file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for payoff curve generation
#[derive(Args)]
pub struct CurveArgs {
    /// Path to a product terms file
    #[arg(long)]
    pub input: Option<String>,

    /// Lowest level sampled (percent)
    #[arg(long)]
    pub min_level: Option<Decimal>,

    /// Highest grid level (percent); landmarks above it are still sampled
    #[arg(long)]
    pub max_level: Option<Decimal>,

    /// Grid spacing in percentage points
    #[arg(long)]
    pub step: Option<Decimal>,
}

/// Arguments for the scenario table
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to a product terms file
    #[arg(long)]
    pub input: Option<String>,

    /// Investment amount; defaults to the notional in the terms
    #[arg(long)]
    pub notional: Option<Decimal>,

    /// Comma-separated levels in percent (e.g. 50,70,100,130)
    #[arg(long, value_delimiter = ',')]
    pub levels: Option<Vec<Decimal>>,
}

fn load_terms(path: Option<&str>) -> Result<ProductTerms, Box<dyn std::error::Error>> {
    let terms: ProductTerms = input::load(path, "product terms")?;
    terms.validate()?;
    Ok(terms)
}

pub fn run_payoff(args: PayoffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = load_terms(args.input.as_deref())?;
    if args.market {
        let evaluation = payoff::evaluate_at_market(&terms)?;
        return Ok(serde_json::to_value(evaluation)?);
    }
    let level = args
        .level
        .ok_or("--level <percent> or --market is required")?;
    let value = payoff::evaluate_payoff(&terms, Percent::new(level))?;
    Ok(serde_json::to_value(value)?)
}

pub fn run_break_even(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = load_terms(args.input.as_deref())?;
    let result = breakeven::solve_break_even(&terms)?;
    Ok(json!({
        "product": terms.product_name(),
        "summary": result.summary(),
        "break_even": result,
    }))
}

pub fn run_curve(args: CurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = load_terms(args.input.as_deref())?;
    let defaults = CurveConfig::default();
    let config = CurveConfig {
        min_level: args.min_level.map(Percent::new).unwrap_or(defaults.min_level),
        max_level: args.max_level.map(Percent::new).unwrap_or(defaults.max_level),
        step: args.step.map(Percent::new).unwrap_or(defaults.step),
    };
    let points = curve::generate_curve_with(&terms, &config)?;
    Ok(serde_json::to_value(points)?)
}

pub fn run_scenarios(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = load_terms(args.input.as_deref())?;
    let levels = match args.levels {
        Some(levels) => levels.into_iter().map(Percent::new).collect(),
        None => scenarios::standard_scenario_levels(&terms)?,
    };
    let notional = args.notional.unwrap_or(terms.notional);
    let rows = scenarios::build_scenario_table(&terms, notional, &levels)?;
    Ok(serde_json::to_value(rows)?)
}
