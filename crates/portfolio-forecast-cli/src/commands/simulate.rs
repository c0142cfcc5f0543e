use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use portfolio_forecast_core::catalog::{PlanCatalog, RiskTier};
use portfolio_forecast_core::forecast::estimate_base_statistics;
use portfolio_forecast_core::monte_carlo::{simulate_growth, GrowthSimulationInput};
use portfolio_forecast_core::portfolio::{compose_portfolio, PortfolioStatistics};

use super::plans::PlanArg;
use super::HistoryArgs;

/// Arguments for the Monte Carlo cross-check of one plan
#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Per-period mean return; with --variance, skips the history inputs
    #[arg(long, requires = "variance", allow_hyphen_values = true)]
    pub mean: Option<Decimal>,

    /// Per-period variance of returns
    #[arg(long, requires = "mean")]
    pub variance: Option<Decimal>,

    /// Tier to simulate
    #[arg(long, default_value = "diversified")]
    pub plan: PlanArg,

    /// Horizon in years
    #[arg(long, default_value = "10")]
    pub years: u32,

    /// Number of simulation paths (minimum 100)
    #[arg(long, default_value = "10000")]
    pub paths: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.history.load_config()?;
    config.validate()?;
    let tier = RiskTier::from(args.plan);

    let (stats, frequency) = match (args.mean, args.variance) {
        (Some(mean), Some(variance)) => (
            PortfolioStatistics::from_moments(tier.to_string(), tier, mean, variance)?,
            args.history.frequency.unwrap_or_default(),
        ),
        _ => {
            let request = args.history.load_request()?;
            let base = estimate_base_statistics(&request.assets, &config)?;
            let catalog = PlanCatalog::standard()?;
            let stats = compose_portfolio(catalog.plan(tier), &base.assets, &base.covariance)?;
            (stats, request.frequency)
        }
    };

    let input = GrowthSimulationInput {
        periods: args.years * frequency.periods_per_year(),
        num_paths: args.paths,
        seed: args.seed,
        k: config.band_width.resolve_k()?,
        log_growth_policy: config.log_growth_policy,
    };
    let result = simulate_growth(&stats, &input)?;
    Ok(serde_json::to_value(result)?)
}
