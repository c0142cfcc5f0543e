use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LogGrowthPolicy;
use crate::error::ForecastError;
use crate::portfolio::PortfolioStatistics;
use crate::statistics::covariance::sqrt_decimal;
use crate::types::{GrowthFactor, ReturnFrequency};
use crate::ForecastResult;

/// Fixed projection horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    TwentyYears,
    FiftyYears,
}

impl Horizon {
    pub const ALL: [Horizon; 6] = [
        Horizon::OneYear,
        Horizon::TwoYears,
        Horizon::FiveYears,
        Horizon::TenYears,
        Horizon::TwentyYears,
        Horizon::FiftyYears,
    ];

    pub fn years(self) -> u32 {
        match self {
            Horizon::OneYear => 1,
            Horizon::TwoYears => 2,
            Horizon::FiveYears => 5,
            Horizon::TenYears => 10,
            Horizon::TwentyYears => 20,
            Horizon::FiftyYears => 50,
        }
    }

    /// Number of sampling periods this horizon spans.
    pub fn periods(self, frequency: ReturnFrequency) -> u32 {
        self.years() * frequency.periods_per_year()
    }

    pub fn from_years(years: u32) -> Option<Horizon> {
        Horizon::ALL.into_iter().find(|h| h.years() == years)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.years() {
            1 => f.write_str("1 year"),
            y => write!(f, "{y} years"),
        }
    }
}

/// Distribution of a plan's growth factor after a number of periods.
///
/// Log-growth is treated as normal with mean `mean_log_growth` and standard
/// deviation `log_growth_std_dev`; `median_growth` equals
/// exp(`mean_log_growth`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedDistribution {
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon: Option<Horizon>,
    pub periods: u32,
    /// (1+μ)^N, the arithmetic expectation of compounded growth.
    pub expected_growth: GrowthFactor,
    pub median_growth: GrowthFactor,
    pub mean_log_growth: Decimal,
    pub log_growth_std_dev: Decimal,
}

/// Project a plan to one of the fixed horizons.
pub fn project_horizon(
    stats: &PortfolioStatistics,
    horizon: Horizon,
    frequency: ReturnFrequency,
    policy: LogGrowthPolicy,
) -> ForecastResult<ProjectedDistribution> {
    let mut dist = project_periods(stats, horizon.periods(frequency), policy)?;
    dist.horizon = Some(horizon);
    Ok(dist)
}

/// Compound per-period (mean, variance) over `periods` independent periods.
///
/// Per period: s² = σ²/(1+μ)² and m = ln(1+μ) − drift, where drift is s²/2
/// under `VarianceAdjusted` and 0 under `Simple`. Over N periods the log-growth
/// mean is N·m and its variance N·s². The median is evaluated as
/// (1+μ)^N · exp(−N·drift) so that a zero-variance plan compounds exactly.
pub fn project_periods(
    stats: &PortfolioStatistics,
    periods: u32,
    policy: LogGrowthPolicy,
) -> ForecastResult<ProjectedDistribution> {
    if periods == 0 {
        return Err(ForecastError::InvalidInput {
            field: "periods".into(),
            reason: "Horizon must span at least one period".into(),
        });
    }

    let gross = Decimal::ONE + stats.mean;
    if gross <= Decimal::ZERO {
        return Err(ForecastError::Projection(format!(
            "Plan '{}' has mean periodic return {} at or below -100%",
            stats.plan, stats.mean
        )));
    }

    let n = Decimal::from(periods);
    let log_var = stats.variance / (gross * gross);
    let drift = match policy {
        LogGrowthPolicy::VarianceAdjusted => log_var / Decimal::TWO,
        LogGrowthPolicy::Simple => Decimal::ZERO,
    };

    let ln_gross = gross.checked_ln().ok_or_else(|| {
        ForecastError::Projection(format!("ln(1 + {}) is undefined", stats.mean))
    })?;
    let expected_growth = gross.checked_powi(i64::from(periods)).ok_or_else(|| {
        ForecastError::Projection(format!(
            "Compounding {} over {} periods overflows",
            gross, periods
        ))
    })?;
    let median_growth = expected_growth * exp_decimal(-(n * drift))?;

    Ok(ProjectedDistribution {
        plan: stats.plan.clone(),
        horizon: None,
        periods,
        expected_growth,
        median_growth,
        mean_log_growth: n * (ln_gross - drift),
        log_growth_std_dev: sqrt_decimal(n * log_var),
    })
}

/// exp(x) with an exact result at zero.
pub(crate) fn exp_decimal(x: Decimal) -> ForecastResult<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::ONE);
    }
    x.checked_exp()
        .ok_or_else(|| ForecastError::Projection(format!("exp({x}) overflows")))
}
