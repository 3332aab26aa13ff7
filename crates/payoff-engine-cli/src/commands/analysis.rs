use clap::Args;
use serde_json::Value;

use payoff_engine_core::analysis::{self, ProductAnalysisRequest};

use crate::input;

/// Arguments for the full product analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to an analysis request file ({ "terms": ..., "curve": ..., "scenario_levels": ... })
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProductAnalysisRequest = input::load(args.input.as_deref(), "product analysis")?;
    let result = analysis::analyze_product(&request)?;
    Ok(serde_json::to_value(result)?)
}
