mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::forecast::ForecastArgs;
use commands::plans::PlansArgs;
use commands::simulate::SimulateArgs;
use commands::stats::StatsArgs;

/// Risk-tiered model portfolio forecasts
#[derive(Parser)]
#[command(
    name = "pforecast",
    version,
    about = "Risk-tiered model portfolio forecasts",
    long_about = "Projects four fixed model portfolios over 1 to 50 year horizons from \
                  historical asset returns, with optimistic, realistic and pessimistic \
                  growth factors computed in decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// List the model portfolios and their weights
    Plans(PlansArgs),
    /// Per-asset statistics and composite plan statistics
    Stats(StatsArgs),
    /// Forecast every plan at every horizon and scenario
    Forecast(ForecastArgs),
    /// Monte Carlo cross-check of one plan's analytic bands
    Simulate(SimulateArgs),
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Plans(args) => commands::plans::run_plans(args),
        Commands::Stats(args) => commands::stats::run_stats(args),
        Commands::Forecast(args) => commands::forecast::run_forecast(args, &cli.output),
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Version => {
            println!("pforecast {}", env!("CARGO_PKG_VERSION"));
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
