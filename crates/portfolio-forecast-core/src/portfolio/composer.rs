use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Plan, RiskTier};
use crate::error::ForecastError;
use crate::statistics::covariance::sqrt_decimal;
use crate::statistics::{AssetStatistics, CovarianceMatrix};
use crate::types::Rate;
use crate::ForecastResult;

/// Composite per-period statistics of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub plan: String,
    pub tier: RiskTier,
    /// Weighted sum of asset means.
    pub mean: Rate,
    /// w' Σ w over the full covariance matrix.
    pub variance: Decimal,
    /// Square root of `variance`.
    pub volatility: Decimal,
    /// Σ wᵢ σᵢ², the weight-averaged asset variance. Reported next to
    /// `variance` to show the diversification effect.
    pub weighted_average_variance: Decimal,
}

impl PortfolioStatistics {
    /// Statistics for a holding known only by its per-period moments, with
    /// no diversification to report.
    pub fn from_moments(
        plan: impl Into<String>,
        tier: RiskTier,
        mean: Rate,
        variance: Decimal,
    ) -> ForecastResult<Self> {
        if variance < Decimal::ZERO {
            return Err(ForecastError::InvalidInput {
                field: "variance".into(),
                reason: "Variance must be non-negative".into(),
            });
        }
        Ok(PortfolioStatistics {
            plan: plan.into(),
            tier,
            mean,
            variance,
            volatility: sqrt_decimal(variance),
            weighted_average_variance: variance,
        })
    }

    /// Variance removed by holding imperfectly correlated assets.
    pub fn diversification_benefit(&self) -> Decimal {
        self.weighted_average_variance - self.variance
    }
}

/// Combine a plan's weights with per-asset statistics and the covariance
/// matrix.
///
/// Any asset the plan holds that is absent from `stats` or `covariance` is a
/// `MissingAsset` error for this plan only. An asset whose variance disagrees
/// with the covariance diagonal is a `DataIntegrity` error.
pub fn compose_portfolio(
    plan: &Plan,
    stats: &[AssetStatistics],
    covariance: &CovarianceMatrix,
) -> ForecastResult<PortfolioStatistics> {
    let mut weights = Vec::with_capacity(plan.weights.len());
    let mut indices = Vec::with_capacity(plan.weights.len());
    let mut means = Vec::with_capacity(plan.weights.len());

    for (asset, weight) in &plan.weights {
        let missing = || ForecastError::MissingAsset {
            plan: plan.name.clone(),
            asset: asset.clone(),
        };
        let stat = stats.iter().find(|s| &s.asset == asset).ok_or_else(missing)?;
        let idx = covariance.index_of(asset).ok_or_else(missing)?;
        let diagonal = covariance.values()[idx][idx];
        if stat.variance != diagonal {
            return Err(ForecastError::DataIntegrity(format!(
                "Asset '{}' has variance {} but covariance diagonal {}",
                asset, stat.variance, diagonal
            )));
        }
        weights.push(*weight);
        indices.push(idx);
        means.push(stat.mean);
    }

    let mean: Decimal = weights.iter().zip(means.iter()).map(|(w, m)| w * m).sum();

    let sigma = covariance.values();
    let sub: Vec<Vec<Decimal>> = indices
        .iter()
        .map(|&i| indices.iter().map(|&j| sigma[i][j]).collect())
        .collect();
    let variance = composite_variance(&weights, &sub);
    let weighted_average_variance: Decimal = weights
        .iter()
        .zip(indices.iter())
        .map(|(w, &i)| w * sigma[i][i])
        .sum();

    Ok(PortfolioStatistics {
        plan: plan.name.clone(),
        tier: plan.tier,
        mean,
        variance,
        volatility: sqrt_decimal(variance),
        weighted_average_variance,
    })
}

/// Quadratic form w' Σ w.
///
/// Σ is positive semi-definite, so a negative result can only be rounding
/// noise and is clamped to zero.
pub fn composite_variance(weights: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    let mut var = Decimal::ZERO;
    for (i, wi) in weights.iter().enumerate() {
        for (j, wj) in weights.iter().enumerate() {
            var += wi * wj * sigma[i][j];
        }
    }
    var.max(Decimal::ZERO)
}
