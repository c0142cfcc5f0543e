use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use portfolio_forecast_core::catalog::{PlanCatalog, RiskTier};

/// Arguments for listing the model portfolios
#[derive(Args)]
pub struct PlansArgs {
    /// Show a single tier only
    #[arg(long)]
    pub plan: Option<PlanArg>,
}

/// Risk tier as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlanArg {
    Diversified,
    Targeted,
    Concentrated,
    Aggressive,
}

impl From<PlanArg> for RiskTier {
    fn from(p: PlanArg) -> Self {
        match p {
            PlanArg::Diversified => RiskTier::Diversified,
            PlanArg::Targeted => RiskTier::Targeted,
            PlanArg::Concentrated => RiskTier::Concentrated,
            PlanArg::Aggressive => RiskTier::Aggressive,
        }
    }
}

pub fn run_plans(args: PlansArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = PlanCatalog::standard()?;
    let rows: Vec<Value> = catalog
        .plans()
        .iter()
        .filter(|p| args.plan.map_or(true, |t| p.tier == RiskTier::from(t)))
        .map(|p| {
            let holdings: Vec<String> = p
                .weights
                .iter()
                .map(|(asset, w)| format!("{} {}%", asset, (*w * Decimal::ONE_HUNDRED).normalize()))
                .collect();
            json!({
                "tier": p.tier.to_string(),
                "name": p.name,
                "holdings": holdings.join(", "),
                "total_weight": p.total_weight().normalize().to_string(),
                "catalog_version": catalog.version(),
            })
        })
        .collect();
    Ok(Value::Array(rows))
}
