use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::RiskTier;
use crate::portfolio::PortfolioStatistics;
use crate::projection::{Horizon, Scenario, ScenarioBands};
use crate::types::{GrowthFactor, Money, ReturnFrequency};

/// One leaf of the grid: a plan's outcome under one scenario at one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioForecast {
    pub plan: RiskTier,
    pub horizon: Horizon,
    pub scenario: Scenario,
    pub growth_factor: GrowthFactor,
    /// `initial_amount × growth_factor` when an amount was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_value: Option<Money>,
}

/// All three scenarios of one plan at one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub horizon: Horizon,
    pub years: u32,
    pub periods: u32,
    /// Arithmetic expectation (1+μ)^N, shown for transparency.
    pub expected_growth: GrowthFactor,
    pub log_growth_std_dev: Decimal,
    pub bands: ScenarioBands,
    /// Ordered as `Scenario::ALL`.
    pub scenarios: [ScenarioForecast; 3],
}

impl HorizonForecast {
    pub fn scenario(&self, scenario: Scenario) -> &ScenarioForecast {
        &self.scenarios[scenario as usize]
    }
}

/// Every horizon of one successfully computed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanForecast {
    pub tier: RiskTier,
    pub name: String,
    /// Composite statistics the projection was built from.
    pub statistics: PortfolioStatistics,
    /// Ordered as `Horizon::ALL`.
    pub horizons: [HorizonForecast; 6],
}

impl PlanForecast {
    pub fn horizon(&self, horizon: Horizon) -> &HorizonForecast {
        &self.horizons[horizon as usize]
    }
}

/// Why a plan is absent from the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFailure {
    pub tier: RiskTier,
    pub plan: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_asset: Option<String>,
}

/// Immutable result of one forecast request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastGrid {
    pub catalog_version: String,
    pub frequency: ReturnFrequency,
    /// Band multiplier used for every plan and horizon.
    pub band_k: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<Money>,
    /// Computed plans in tier order.
    pub plans: Vec<PlanForecast>,
    pub failures: Vec<PlanFailure>,
}

impl ForecastGrid {
    pub fn plan(&self, tier: RiskTier) -> Option<&PlanForecast> {
        self.plans.iter().find(|p| p.tier == tier)
    }

    pub fn failure(&self, tier: RiskTier) -> Option<&PlanFailure> {
        self.failures.iter().find(|f| f.tier == tier)
    }

    /// True when every plan was computed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.plans.len() == RiskTier::ALL.len()
    }

    /// Every (plan, horizon, scenario) leaf in plan, horizon, scenario order.
    pub fn cells(&self) -> impl Iterator<Item = &ScenarioForecast> {
        self.plans
            .iter()
            .flat_map(|p| p.horizons.iter())
            .flat_map(|h| h.scenarios.iter())
    }
}
