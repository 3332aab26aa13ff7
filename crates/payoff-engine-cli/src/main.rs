mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::AnalyzeArgs;
use commands::basket::BasketArgs;
use commands::payoff::{BreakEvenArgs, CurveArgs, PayoffArgs, ScenarioArgs};

/// Structured-product payoff and break-even engine
#[derive(Parser)]
#[command(
    name = "payoff",
    version,
    about = "Structured-product payoff, break-even and scenario calculations",
    long_about = "Evaluates reverse convertibles, capital-protected participation notes and \
                  bonus certificates with decimal precision: basket resolution, maturity \
                  payoffs, break-even levels, payoff curves and scenario tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine decisions to stderr (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a basket of underlyings to one settlement level
    Basket(BasketArgs),
    /// Evaluate the maturity payoff at a level
    Payoff(PayoffArgs),
    /// Solve for the break-even level(s)
    BreakEven(BreakEvenArgs),
    /// Sample the payoff curve for charting
    Curve(CurveArgs),
    /// Build the illustrative scenario table
    Scenarios(ScenarioArgs),
    /// Full report payload: break-even, landmarks, curve, scenarios, market snapshot
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Basket(args) => commands::basket::run_basket(args),
        Commands::Payoff(args) => commands::payoff::run_payoff(args),
        Commands::BreakEven(args) => commands::payoff::run_break_even(args),
        Commands::Curve(args) => commands::payoff::run_curve(args),
        Commands::Scenarios(args) => commands::payoff::run_scenarios(args),
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Version => {
            println!("payoff {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
