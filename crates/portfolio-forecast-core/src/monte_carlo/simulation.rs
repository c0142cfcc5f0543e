use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::time::Instant;
use tracing::debug;

use crate::config::LogGrowthPolicy;
use crate::error::ForecastError;
use crate::portfolio::PortfolioStatistics;
use crate::projection::{calibrate, project_periods, ScenarioBands};
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::ForecastResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Settings for simulating one plan's compounded growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSimulationInput {
    /// Number of periods to compound.
    pub periods: u32,
    /// Number of simulation paths (minimum 100).
    #[serde(default = "default_num_paths")]
    pub num_paths: u32,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
    /// Band multiplier used for the analytic comparison and to pick the
    /// matching percentiles.
    #[serde(default = "default_k")]
    pub k: Decimal,
    #[serde(default)]
    pub log_growth_policy: LogGrowthPolicy,
}

fn default_num_paths() -> u32 {
    10_000
}

fn default_k() -> Decimal {
    Decimal::ONE
}

/// Simulated growth factors next to the analytic bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSimulationOutput {
    pub plan: String,
    pub periods: u32,
    pub num_paths: u32,
    /// Percentile matching the pessimistic band, Φ(−k)·100.
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
    pub mean: f64,
    /// Share of paths ending below the starting value.
    pub probability_of_loss: f64,
    /// Share of paths that hit the zero floor.
    pub ruined_paths: f64,
    pub analytic: ScenarioBands,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Percentile of a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn to_f64(field: &str, value: Decimal) -> ForecastResult<f64> {
    value.to_f64().ok_or_else(|| ForecastError::InvalidInput {
        field: field.into(),
        reason: format!("{value} is not representable as f64"),
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate compounded growth of a plan and compare with the closed form.
///
/// Each path draws `periods` arithmetic returns from Normal(μ, σ) and
/// multiplies the growth factors; a path that reaches zero stays there.
pub fn simulate_growth(
    stats: &PortfolioStatistics,
    input: &GrowthSimulationInput,
) -> ForecastResult<ComputationOutput<GrowthSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.num_paths < 100 {
        return Err(ForecastError::InvalidInput {
            field: "num_paths".into(),
            reason: "Must be at least 100".into(),
        });
    }

    let dist = project_periods(stats, input.periods, input.log_growth_policy)?;
    let analytic = calibrate(&dist, input.k, Decimal::ZERO)?;

    let mean = to_f64("mean", stats.mean)?;
    let std_dev = to_f64("volatility", stats.volatility)?;
    let k = to_f64("k", input.k)?;

    // A riskless plan compounds its mean exactly
    let returns = if std_dev > 0.0 {
        Some(
            Normal::new(mean, std_dev).map_err(|e| ForecastError::InvalidInput {
                field: "distribution".into(),
                reason: format!("Invalid Normal parameters: {e}"),
            })?,
        )
    } else {
        None
    };
    let standard = Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n = input.num_paths as usize;
    let mut finals = Vec::with_capacity(n);
    let mut ruined = 0usize;
    for _ in 0..n {
        let mut growth = 1.0_f64;
        for _ in 0..input.periods {
            let r = match &returns {
                Some(d) => rng.sample(d),
                None => mean,
            };
            growth *= 1.0 + r;
            if growth <= 0.0 {
                growth = 0.0;
                break;
            }
        }
        if growth == 0.0 {
            ruined += 1;
        }
        finals.push(growth);
    }
    finals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let lower_percentile = standard.cdf(-k) * 100.0;
    let upper_percentile = standard.cdf(k) * 100.0;
    let total = n as f64;
    let losses = finals.iter().filter(|g| **g < 1.0).count();

    if ruined > 0 {
        warnings.push(format!(
            "{ruined} of {n} paths lost the full principal and were floored at zero"
        ));
    }

    let output = GrowthSimulationOutput {
        plan: stats.plan.clone(),
        periods: input.periods,
        num_paths: input.num_paths,
        lower_percentile,
        upper_percentile,
        lower: percentile_sorted(&finals, lower_percentile),
        median: percentile_sorted(&finals, 50.0),
        upper: percentile_sorted(&finals, upper_percentile),
        mean: finals.iter().sum::<f64>() / total,
        probability_of_loss: losses as f64 / total,
        ruined_paths: ruined as f64 / total,
        analytic,
    };
    debug!(
        plan = %output.plan,
        periods = output.periods,
        median = output.median,
        "growth simulation finished"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo compounding of normal periodic returns",
        &serde_json::json!({
            "num_paths": input.num_paths,
            "seed": input.seed,
            "periods": input.periods,
            "mean": stats.mean.to_string(),
            "volatility": stats.volatility.to_string(),
            "k": input.k.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
