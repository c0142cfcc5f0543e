use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;

use portfolio_forecast_core::catalog::{PlanCatalog, RiskTier};
use portfolio_forecast_core::forecast::{ForecastGrid, ForecastService};
use portfolio_forecast_core::projection::Horizon;

use super::plans::PlanArg;
use super::HistoryArgs;
use crate::OutputFormat;

/// Arguments for the plan × horizon × scenario forecast
#[derive(Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Initial investment; adds projected values next to growth factors
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Restrict rows to one tier (table, csv and minimal output)
    #[arg(long)]
    pub plan: Option<PlanArg>,

    /// Restrict rows to one horizon in years: 1, 2, 5, 10, 20 or 50
    #[arg(long)]
    pub years: Option<u32>,
}

pub fn run_forecast(
    args: ForecastArgs,
    format: &OutputFormat,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request = args.history.load_request()?;
    if args.amount.is_some() {
        request.initial_amount = args.amount;
    }
    let config = args.history.load_config()?;

    let horizon = match args.years {
        Some(y) => Some(
            Horizon::from_years(y)
                .ok_or_else(|| format!("Unsupported horizon {y}. Use: 1, 2, 5, 10, 20, 50"))?,
        ),
        None => None,
    };

    let service = ForecastService::new(Arc::new(PlanCatalog::standard()?), config)?;
    let output = service.forecast(&request)?;

    if let OutputFormat::Json = format {
        return Ok(serde_json::to_value(output)?);
    }

    for w in &output.warnings {
        eprintln!("{}: {}", "warning".yellow().bold(), w);
    }
    Ok(Value::Array(cell_rows(
        &output.result,
        args.plan.map(RiskTier::from),
        horizon,
    )))
}

/// One flat row per grid cell.
fn cell_rows(grid: &ForecastGrid, plan: Option<RiskTier>, horizon: Option<Horizon>) -> Vec<Value> {
    grid.cells()
        .filter(|c| plan.map_or(true, |t| c.plan == t))
        .filter(|c| horizon.map_or(true, |h| c.horizon == h))
        .map(|c| {
            let mut row = json!({
                "plan": c.plan.to_string(),
                "years": c.horizon.years(),
                "scenario": c.scenario.to_string(),
                "growth_factor": c.growth_factor.round_dp(6).to_string(),
            });
            if let Some(v) = c.projected_value {
                row["projected_value"] = json!(v.round_dp(2).to_string());
            }
            row
        })
        .collect()
}
