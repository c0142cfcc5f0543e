use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::plan::{Plan, RiskTier};
use crate::error::ForecastError;
use crate::ForecastResult;

/// Allowed deviation of a plan's total weight from 1.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.001);

/// Version label of the built-in catalog.
pub const STANDARD_CATALOG_VERSION: &str = "standard-v1";

/// Broad-market benchmarks plus the "Magnificent Seven".
pub const STANDARD_UNIVERSE: [&str; 9] = [
    "SPY", "QQQ", "AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "TSLA",
];

/// Set of asset ids plans may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUniverse {
    assets: BTreeSet<String>,
}

impl AssetUniverse {
    pub fn new<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AssetUniverse {
            assets: assets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_UNIVERSE)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.assets.contains(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|s| s.as_str())
    }
}

/// Validated, immutable registry of exactly one plan per risk tier.
///
/// Once constructed the catalog is never mutated; share it behind an `Arc`
/// and key any downstream cache on `version()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanCatalog {
    version: String,
    universe: AssetUniverse,
    /// Indexed by `RiskTier::index()`.
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// Validate and freeze a set of plans. Any invalid plan fails the whole
    /// catalog.
    pub fn new(
        version: impl Into<String>,
        universe: AssetUniverse,
        plans: Vec<Plan>,
    ) -> ForecastResult<Self> {
        for plan in &plans {
            validate_plan(plan, &universe)?;
        }

        let mut ordered: Vec<Option<Plan>> = vec![None; RiskTier::ALL.len()];
        for plan in plans {
            let slot = &mut ordered[plan.tier.index()];
            if slot.is_some() {
                return Err(ForecastError::CatalogValidation {
                    plan: plan.name,
                    reason: format!("Duplicate plan for tier {}", plan.tier),
                });
            }
            *slot = Some(plan);
        }

        let mut plans = Vec::with_capacity(RiskTier::ALL.len());
        for (tier, slot) in RiskTier::ALL.iter().zip(ordered) {
            match slot {
                Some(p) => plans.push(p),
                None => {
                    return Err(ForecastError::CatalogValidation {
                        plan: tier.to_string(),
                        reason: format!("No plan defined for tier {tier}"),
                    })
                }
            }
        }

        let catalog = PlanCatalog {
            version: version.into(),
            universe,
            plans,
        };
        tracing::debug!(version = %catalog.version, "plan catalog validated");
        Ok(catalog)
    }

    /// The four built-in model portfolios.
    pub fn standard() -> ForecastResult<Self> {
        Self::new(
            STANDARD_CATALOG_VERSION,
            AssetUniverse::standard(),
            standard_plans(),
        )
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn plan(&self, tier: RiskTier) -> &Plan {
        &self.plans[tier.index()]
    }

    /// Plans in tier order.
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }
}

fn standard_plans() -> Vec<Plan> {
    vec![
        Plan::new(
            "Diversified",
            RiskTier::Diversified,
            [("SPY", dec!(0.70)), ("QQQ", dec!(0.30))],
        ),
        Plan::new(
            "Targeted",
            RiskTier::Targeted,
            [
                ("SPY", dec!(0.40)),
                ("QQQ", dec!(0.30)),
                ("AAPL", dec!(0.10)),
                ("MSFT", dec!(0.10)),
                ("GOOGL", dec!(0.10)),
            ],
        ),
        Plan::new(
            "Concentrated",
            RiskTier::Concentrated,
            [
                ("AAPL", dec!(0.15)),
                ("MSFT", dec!(0.15)),
                ("NVDA", dec!(0.15)),
                ("AMZN", dec!(0.15)),
                ("GOOGL", dec!(0.15)),
                ("META", dec!(0.15)),
                ("TSLA", dec!(0.10)),
            ],
        ),
        Plan::new(
            "Aggressive",
            RiskTier::Aggressive,
            [
                ("NVDA", dec!(0.35)),
                ("TSLA", dec!(0.35)),
                ("META", dec!(0.30)),
            ],
        ),
    ]
}

fn validate_plan(plan: &Plan, universe: &AssetUniverse) -> ForecastResult<()> {
    let reject = |reason: String| ForecastError::CatalogValidation {
        plan: plan.name.clone(),
        reason,
    };

    if plan.weights.is_empty() {
        return Err(reject("Plan holds no assets".into()));
    }
    for (asset, weight) in &plan.weights {
        if *weight < Decimal::ZERO || *weight > Decimal::ONE {
            return Err(reject(format!(
                "Weight {weight} for '{asset}' outside [0, 1]"
            )));
        }
        if !universe.contains(asset) {
            return Err(reject(format!("Asset '{asset}' is not in the universe")));
        }
    }
    let total = plan.total_weight();
    if (total - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        return Err(reject(format!("Weights sum to {total}, expected 1")));
    }
    Ok(())
}
