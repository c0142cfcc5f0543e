use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use portfolio_forecast_core::catalog::PlanCatalog;
use portfolio_forecast_core::forecast::estimate_base_statistics;
use portfolio_forecast_core::portfolio::compose_portfolio;
use portfolio_forecast_core::with_metadata;

use super::HistoryArgs;

/// Arguments for per-asset and per-plan statistics
#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub history: HistoryArgs,
}

pub fn run_stats(args: StatsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = args.history.load_request()?;
    let config = args.history.load_config()?;
    config.validate()?;

    let base = estimate_base_statistics(&request.assets, &config)?;
    let catalog = PlanCatalog::standard()?;

    let mut plans = Vec::new();
    let mut warnings = Vec::new();
    for plan in catalog.plans() {
        match compose_portfolio(plan, &base.assets, &base.covariance) {
            Ok(p) => plans.push(p),
            Err(e) if e.is_plan_scoped() => {
                warnings.push(format!("Plan '{}' unavailable: {}", plan.name, e))
            }
            Err(e) => return Err(e.into()),
        }
    }

    let output = with_metadata(
        "Sample mean and variance per asset, sample covariance, w'Σw per plan",
        &json!({
            "frequency": request.frequency,
            "assets": request.assets.len(),
            "min_observations": config.min_observations,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        json!({
            "assets": base.assets,
            "covariance": base.covariance,
            "plans": plans,
        }),
    );
    Ok(serde_json::to_value(output)?)
}
