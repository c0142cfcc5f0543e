use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::ForecastError;
use crate::ForecastResult;

/// How wide the optimistic/pessimistic band sits around the realistic case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BandWidth {
    /// Fixed number of log-growth standard deviations.
    Sigma { k: Decimal },
    /// Two-sided central interval, e.g. 0.80 puts the bands at P10/P90.
    Confidence { level: Decimal },
}

impl Default for BandWidth {
    fn default() -> Self {
        BandWidth::Sigma { k: Decimal::ONE }
    }
}

impl BandWidth {
    /// Resolve to the band multiplier k.
    pub fn resolve_k(&self) -> ForecastResult<Decimal> {
        match *self {
            BandWidth::Sigma { k } => {
                if k <= Decimal::ZERO {
                    return Err(ForecastError::InvalidInput {
                        field: "band_width.k".into(),
                        reason: "Band multiplier must be positive".into(),
                    });
                }
                Ok(k)
            }
            BandWidth::Confidence { level } => {
                if level <= Decimal::ZERO || level >= Decimal::ONE {
                    return Err(ForecastError::InvalidInput {
                        field: "band_width.level".into(),
                        reason: "Confidence level must be between 0 and 1 (exclusive)".into(),
                    });
                }
                let level_f = level.to_f64().ok_or_else(|| ForecastError::InvalidInput {
                    field: "band_width.level".into(),
                    reason: format!("Cannot represent {level} as f64"),
                })?;
                let std_normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::InvalidInput {
                    field: "band_width".into(),
                    reason: format!("Invalid Normal parameters: {e}"),
                })?;
                let z = std_normal.inverse_cdf((1.0 + level_f) / 2.0);
                Decimal::try_from(z)
                    .map(|k| k.round_dp(6))
                    .map_err(|e| ForecastError::InvalidInput {
                        field: "band_width.level".into(),
                        reason: format!("Band multiplier out of range: {e}"),
                    })
            }
        }
    }
}

/// Drift used when converting a per-period arithmetic mean into a log-growth
/// mean. Fixed for a whole run so that every plan and horizon is compounded
/// by the same rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogGrowthPolicy {
    /// m = ln(1+μ) − s²/2 where s² = σ²/(1+μ)²
    #[default]
    VarianceAdjusted,
    /// m = ln(1+μ)
    Simple,
}

/// Tunable forecasting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub band_width: BandWidth,
    /// Lowest growth factor the pessimistic case may report (0 = total loss).
    pub pessimistic_floor: Decimal,
    /// Minimum periods of history per asset.
    pub min_observations: usize,
    pub log_growth_policy: LogGrowthPolicy,
    /// Pivot tolerance for the positive semi-definite check, relative to the
    /// largest variance in the matrix.
    pub psd_tolerance: Decimal,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            band_width: BandWidth::default(),
            pessimistic_floor: Decimal::ZERO,
            min_observations: 12,
            log_growth_policy: LogGrowthPolicy::default(),
            psd_tolerance: dec!(0.000000000001),
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> ForecastResult<()> {
        self.band_width.resolve_k()?;
        if self.pessimistic_floor < Decimal::ZERO {
            return Err(ForecastError::InvalidInput {
                field: "pessimistic_floor".into(),
                reason: "Floor must be non-negative".into(),
            });
        }
        if self.min_observations < 2 {
            return Err(ForecastError::InvalidInput {
                field: "min_observations".into(),
                reason: "Sample variance needs at least 2 observations".into(),
            });
        }
        if self.psd_tolerance < Decimal::ZERO {
            return Err(ForecastError::InvalidInput {
                field: "psd_tolerance".into(),
                reason: "Tolerance must be non-negative".into(),
            });
        }
        Ok(())
    }
}
