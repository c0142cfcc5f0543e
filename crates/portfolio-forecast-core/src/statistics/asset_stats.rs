use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::types::Rate;
use crate::ForecastResult;

/// Historical periodic returns for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHistory {
    /// Ticker or name, matched against plan weights.
    pub id: String,
    /// Ordered periodic returns as decimals (0.01 = 1% per period).
    pub returns: Vec<Rate>,
    /// Calendar start of the first period, when known. Series compared in one
    /// run must agree on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
}

impl AssetHistory {
    pub fn new(id: impl Into<String>, returns: Vec<Rate>) -> Self {
        AssetHistory {
            id: id.into(),
            returns,
            period_start: None,
        }
    }
}

/// Per-period mean and variance of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub asset: String,
    pub mean: Rate,
    pub variance: Decimal,
    pub observations: usize,
}

/// Mean and unbiased sample variance of an asset's periodic returns.
pub fn compute_asset_statistics(
    history: &AssetHistory,
    min_observations: usize,
) -> ForecastResult<AssetStatistics> {
    check_returns(history)?;
    let n = history.returns.len();
    if n < min_observations.max(2) {
        return Err(ForecastError::InsufficientData(format!(
            "Asset '{}' has {} return observations, at least {} required",
            history.id,
            n,
            min_observations.max(2)
        )));
    }

    let mean = mean(&history.returns);
    let variance = sample_variance(&history.returns, mean);

    Ok(AssetStatistics {
        asset: history.id.clone(),
        mean,
        variance,
        observations: n,
    })
}

/// A period cannot lose more than everything: every return must exceed -100%.
pub fn check_returns(history: &AssetHistory) -> ForecastResult<()> {
    match history.returns.iter().position(|r| *r <= -Decimal::ONE) {
        Some(i) => Err(ForecastError::InvalidInput {
            field: format!("assets.{}.returns", history.id),
            reason: format!(
                "Return {} at period {} is at or below -100%",
                history.returns[i], i
            ),
        }),
        None => Ok(()),
    }
}

pub(crate) fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = data.iter().sum();
    sum / Decimal::from(data.len() as i64)
}

/// Sample variance (n-1 denominator)
pub(crate) fn sample_variance(data: &[Decimal], mean: Decimal) -> Decimal {
    let n = data.len();
    if n < 2 {
        return Decimal::ZERO;
    }
    let sum_sq: Decimal = data.iter().map(|x| (x - mean) * (x - mean)).sum();
    sum_sq / Decimal::from((n - 1) as i64)
}
