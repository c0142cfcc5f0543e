use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::grid::{ForecastGrid, HorizonForecast, PlanFailure, PlanForecast, ScenarioForecast};
use crate::catalog::{Plan, PlanCatalog};
use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::portfolio::{compose_portfolio, PortfolioStatistics};
use crate::projection::{calibrate, project_horizon, Horizon, Scenario};
use crate::statistics::{
    check_aligned, check_returns, compute_asset_statistics, estimate_covariance, AssetHistory,
    AssetStatistics, CovarianceMatrix,
};
use crate::types::{with_metadata, ComputationOutput, Money, ReturnFrequency};
use crate::ForecastResult;

/// One forecast request: the asset universe's history and an optional amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub assets: Vec<AssetHistory>,
    #[serde(default)]
    pub frequency: ReturnFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<Money>,
}

/// Per-asset statistics and covariance shared by every plan in a request.
#[derive(Debug, Clone, Serialize)]
pub struct BaseStatistics {
    pub assets: Vec<AssetStatistics>,
    pub covariance: CovarianceMatrix,
}

/// Estimate the per-asset inputs every plan is composed from.
///
/// Fails the whole request on impossible returns, misaligned or short
/// histories (`InvalidInput`/`InsufficientData`) and on a covariance matrix
/// that is not positive semi-definite (`DataIntegrity`).
pub fn estimate_base_statistics(
    histories: &[AssetHistory],
    config: &ForecastConfig,
) -> ForecastResult<BaseStatistics> {
    if histories.is_empty() {
        return Err(ForecastError::InsufficientData(
            "At least one asset history required".into(),
        ));
    }
    for history in histories {
        check_returns(history)?;
    }
    check_aligned(histories)?;

    let assets = histories
        .iter()
        .map(|h| compute_asset_statistics(h, config.min_observations))
        .collect::<ForecastResult<Vec<_>>>()?;
    let covariance = estimate_covariance(histories, config.psd_tolerance)?;

    Ok(BaseStatistics { assets, covariance })
}

/// Entry point the dashboard calls.
///
/// Holds only the shared, read-only catalog and policy; every request builds
/// its own derived values, so one service can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct ForecastService {
    catalog: Arc<PlanCatalog>,
    config: ForecastConfig,
    band_k: Decimal,
}

impl ForecastService {
    pub fn new(catalog: Arc<PlanCatalog>, config: ForecastConfig) -> ForecastResult<Self> {
        config.validate()?;
        let band_k = config.band_width.resolve_k()?;
        Ok(ForecastService {
            catalog,
            config,
            band_k,
        })
    }

    /// Built-in catalog with default policy.
    pub fn standard() -> ForecastResult<Self> {
        Self::new(Arc::new(PlanCatalog::standard()?), ForecastConfig::default())
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn band_k(&self) -> Decimal {
        self.band_k
    }

    /// Forecast every plan at every horizon under every scenario.
    ///
    /// Plans that fail with a plan-scoped error are left out of the grid and
    /// listed in `failures`; any other error aborts the request.
    pub fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> ForecastResult<ComputationOutput<ForecastGrid>> {
        check_amount(request.initial_amount)?;
        let base = estimate_base_statistics(&request.assets, &self.config)?;
        self.forecast_from_base(&base, request.frequency, request.initial_amount)
    }

    /// Forecast from statistics estimated elsewhere, e.g. once and reused
    /// across several amounts.
    pub fn forecast_from_base(
        &self,
        base: &BaseStatistics,
        frequency: ReturnFrequency,
        initial_amount: Option<Money>,
    ) -> ForecastResult<ComputationOutput<ForecastGrid>> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();
        check_amount(initial_amount)?;

        let mut plans = Vec::with_capacity(self.catalog.plans().len());
        let mut failures = Vec::new();
        for plan in self.catalog.plans() {
            match self.forecast_plan(plan, base, frequency, initial_amount) {
                Ok(pf) => {
                    debug!(
                        plan = %plan.name,
                        mean = %pf.statistics.mean,
                        variance = %pf.statistics.variance,
                        "plan forecast computed"
                    );
                    plans.push(pf);
                }
                Err(e) if e.is_plan_scoped() => {
                    warn!(plan = %plan.name, error = %e, "plan unavailable");
                    warnings.push(format!("Plan '{}' unavailable: {}", plan.name, e));
                    let missing_asset = match &e {
                        ForecastError::MissingAsset { asset, .. } => Some(asset.clone()),
                        _ => None,
                    };
                    failures.push(PlanFailure {
                        tier: plan.tier,
                        plan: plan.name.clone(),
                        reason: e.to_string(),
                        missing_asset,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let grid = ForecastGrid {
            catalog_version: self.catalog.version().to_string(),
            frequency,
            band_k: self.band_k,
            initial_amount,
            plans,
            failures,
        };
        info!(
            catalog = %grid.catalog_version,
            computed = grid.plans.len(),
            failed = grid.failures.len(),
            "forecast grid assembled"
        );

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Composite mean/covariance per plan, log-normal compounding over independent \
             periods, median scenario with fixed-k log-space bands",
            &serde_json::json!({
                "catalog_version": self.catalog.version(),
                "frequency": frequency,
                "assets": base.assets.len(),
                "band_k": self.band_k.to_string(),
                "config": self.config,
            }),
            warnings,
            elapsed,
            grid,
        ))
    }

    fn forecast_plan(
        &self,
        plan: &Plan,
        base: &BaseStatistics,
        frequency: ReturnFrequency,
        initial_amount: Option<Money>,
    ) -> ForecastResult<PlanForecast> {
        let statistics = compose_portfolio(plan, &base.assets, &base.covariance)?;
        let [h1, h2, h5, h10, h20, h50] = Horizon::ALL
            .map(|h| self.forecast_horizon(plan, &statistics, h, frequency, initial_amount));

        Ok(PlanForecast {
            tier: plan.tier,
            name: plan.name.clone(),
            statistics,
            horizons: [h1?, h2?, h5?, h10?, h20?, h50?],
        })
    }

    fn forecast_horizon(
        &self,
        plan: &Plan,
        statistics: &PortfolioStatistics,
        horizon: Horizon,
        frequency: ReturnFrequency,
        initial_amount: Option<Money>,
    ) -> ForecastResult<HorizonForecast> {
        let dist = project_horizon(statistics, horizon, frequency, self.config.log_growth_policy)?;
        let bands = calibrate(&dist, self.band_k, self.config.pessimistic_floor)?;

        let [optimistic, realistic, pessimistic] =
            Scenario::ALL.map(|scenario| -> ForecastResult<ScenarioForecast> {
                let growth_factor = bands.get(scenario);
                let projected_value = initial_amount
                    .map(|amt| {
                        amt.checked_mul(growth_factor).ok_or_else(|| {
                            ForecastError::Projection(format!(
                                "Plan '{}': {} x {} overflows at {} ({})",
                                plan.name, amt, growth_factor, horizon, scenario
                            ))
                        })
                    })
                    .transpose()?;
                Ok(ScenarioForecast {
                    plan: plan.tier,
                    horizon,
                    scenario,
                    growth_factor,
                    projected_value,
                })
            });

        Ok(HorizonForecast {
            horizon,
            years: horizon.years(),
            periods: dist.periods,
            expected_growth: dist.expected_growth,
            log_growth_std_dev: dist.log_growth_std_dev,
            bands,
            scenarios: [optimistic?, realistic?, pessimistic?],
        })
    }
}

fn check_amount(initial_amount: Option<Money>) -> ForecastResult<()> {
    if let Some(amount) = initial_amount {
        if amount <= Decimal::ZERO {
            return Err(ForecastError::InvalidInput {
                field: "initial_amount".into(),
                reason: "Initial investment must be positive".into(),
            });
        }
    }
    Ok(())
}
