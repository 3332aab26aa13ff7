use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use payoff_engine_core::analysis::ProductAnalysisRequest;
use payoff_engine_core::curve::CurveConfig;
use payoff_engine_core::terms::{BasketSpec, ProductTerms};
use payoff_engine_core::Percent;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_terms(terms_json: &str) -> NapiResult<ProductTerms> {
    let terms: ProductTerms = serde_json::from_str(terms_json).map_err(to_napi_error)?;
    terms.validate().map_err(to_napi_error)?;
    Ok(terms)
}

fn parse_level(level: &str) -> NapiResult<Percent> {
    level
        .trim()
        .parse::<Decimal>()
        .map(Percent::new)
        .map_err(|e| to_napi_error(format!("invalid level '{level}': {e}")))
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BasketInput {
    spec: BasketSpec,
    spots: Vec<Decimal>,
    initial_fixings: Vec<Decimal>,
}

/// Resolve explicit spot/fixing vectors against a basket rule.
#[napi]
pub fn resolve_basket(input_json: String) -> NapiResult<String> {
    let input: BasketInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_engine_core::resolve_basket(&input.spec, &input.spots, &input.initial_fixings)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Resolve a basket whose underlyings carry their own spots.
#[napi]
pub fn resolve_basket_spec(spec_json: String) -> NapiResult<String> {
    let spec: BasketSpec = serde_json::from_str(&spec_json).map_err(to_napi_error)?;
    let output = payoff_engine_core::resolve_basket_spec(&spec).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Payoff
// ---------------------------------------------------------------------------

/// Levels cross the boundary as decimal strings ("87.5") to keep precision.
#[napi]
pub fn evaluate_payoff(terms_json: String, level: String) -> NapiResult<String> {
    let terms = parse_terms(&terms_json)?;
    let output = payoff_engine_core::evaluate_payoff(&terms, parse_level(&level)?)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn evaluate_at_market(terms_json: String) -> NapiResult<String> {
    let terms = parse_terms(&terms_json)?;
    let output =
        payoff_engine_core::payoff::evaluate_at_market(&terms).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_break_even(terms_json: String) -> NapiResult<String> {
    let terms = parse_terms(&terms_json)?;
    let output = payoff_engine_core::solve_break_even(&terms).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Curve and scenarios
// ---------------------------------------------------------------------------

/// `config_json` may be omitted for the default 0..=160 grid at 1-point steps.
#[napi]
pub fn generate_curve(terms_json: String, config_json: Option<String>) -> NapiResult<String> {
    let terms = parse_terms(&terms_json)?;
    let config: CurveConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => CurveConfig::default(),
    };
    let output = payoff_engine_core::curve::generate_curve_with(&terms, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ScenarioInput {
    terms: ProductTerms,
    notional: Option<Decimal>,
    levels: Option<Vec<Percent>>,
}

#[napi]
pub fn build_scenario_table(input_json: String) -> NapiResult<String> {
    let input: ScenarioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let levels = match input.levels {
        Some(levels) => levels,
        None => payoff_engine_core::scenarios::standard_scenario_levels(&input.terms)
            .map_err(to_napi_error)?,
    };
    let notional = input.notional.unwrap_or(input.terms.notional);
    let output = payoff_engine_core::build_scenario_table(&input.terms, notional, &levels)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_product(input_json: String) -> NapiResult<String> {
    let request: ProductAnalysisRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        payoff_engine_core::analysis::analyze_product(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
