use clap::Args;
use serde_json::Value;

use payoff_engine_core::basket;
use payoff_engine_core::terms::BasketSpec;

use crate::input;

/// Arguments for basket resolution
#[derive(Args)]
pub struct BasketArgs {
    /// Path to a basket file (rule + underlyings with initial_fixing and spot)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_basket(args: BasketArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let spec: BasketSpec = input::load(args.input.as_deref(), "basket resolution")?;
    let resolution = basket::resolve_basket_spec(&spec)?;
    Ok(serde_json::to_value(resolution)?)
}
