use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::horizon::{exp_decimal, ProjectedDistribution};
use crate::error::ForecastError;
use crate::types::GrowthFactor;
use crate::ForecastResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scenario {
    Optimistic,
    Realistic,
    Pessimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Optimistic,
        Scenario::Realistic,
        Scenario::Pessimistic,
    ];
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scenario::Optimistic => "Optimistic",
            Scenario::Realistic => "Realistic",
            Scenario::Pessimistic => "Pessimistic",
        };
        f.write_str(s)
    }
}

/// Growth factors of the three named outcomes at one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBands {
    pub optimistic: GrowthFactor,
    pub realistic: GrowthFactor,
    pub pessimistic: GrowthFactor,
}

impl ScenarioBands {
    pub fn get(&self, scenario: Scenario) -> GrowthFactor {
        match scenario {
            Scenario::Optimistic => self.optimistic,
            Scenario::Realistic => self.realistic,
            Scenario::Pessimistic => self.pessimistic,
        }
    }
}

/// Map a projected distribution to its three scenario growth factors.
///
/// Realistic is the median exp(m). Optimistic and pessimistic sit `k` log
/// standard deviations either side: exp(m ± kσ). Every value is held at or
/// above `floor`, which keeps the ordering intact.
pub fn calibrate(
    dist: &ProjectedDistribution,
    k: Decimal,
    floor: GrowthFactor,
) -> ForecastResult<ScenarioBands> {
    if k <= Decimal::ZERO {
        return Err(ForecastError::InvalidInput {
            field: "k".into(),
            reason: "Band multiplier must be positive".into(),
        });
    }
    if floor < Decimal::ZERO {
        return Err(ForecastError::InvalidInput {
            field: "floor".into(),
            reason: "Growth factor floor must be non-negative".into(),
        });
    }

    let spread = k * dist.log_growth_std_dev;
    let realistic = dist.median_growth;
    let widen = |factor: Decimal| {
        realistic.checked_mul(factor).ok_or_else(|| {
            ForecastError::Projection(format!(
                "Plan '{}': band {} x {} overflows",
                dist.plan, realistic, factor
            ))
        })
    };
    let optimistic = widen(exp_decimal(spread)?)?;
    let pessimistic = widen(exp_decimal(-spread)?)?;

    Ok(ScenarioBands {
        optimistic: optimistic.max(floor),
        realistic: realistic.max(floor),
        pessimistic: pessimistic.max(floor),
    })
}
