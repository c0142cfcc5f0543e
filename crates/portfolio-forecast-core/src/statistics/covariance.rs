use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::Serialize;
use std::collections::HashSet;

use super::asset_stats::{mean, AssetHistory};
use crate::error::ForecastError;
use crate::ForecastResult;

/// Square, symmetric, positive semi-definite covariance matrix keyed by asset id.
///
/// Rows and columns follow the order of `assets`. Construction always goes
/// through a validating constructor, so any value of this type has passed the
/// symmetry and semi-definiteness checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovarianceMatrix {
    assets: Vec<String>,
    values: Vec<Vec<Decimal>>,
}

impl CovarianceMatrix {
    /// Build from an explicit matrix, validating shape, symmetry and
    /// positive semi-definiteness.
    pub fn from_parts(
        assets: Vec<String>,
        values: Vec<Vec<Decimal>>,
        psd_tolerance: Decimal,
    ) -> ForecastResult<Self> {
        let n = assets.len();
        check_unique(&assets)?;
        if values.len() != n {
            return Err(ForecastError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Expected {}x{} matrix but got {} rows", n, n, values.len()),
            });
        }
        for (i, row) in values.iter().enumerate() {
            if row.len() != n {
                return Err(ForecastError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
                });
            }
        }
        for i in 0..n {
            if values[i][i] < Decimal::ZERO {
                return Err(ForecastError::DataIntegrity(format!(
                    "Negative variance {} for asset '{}'",
                    values[i][i], assets[i]
                )));
            }
            for j in (i + 1)..n {
                if values[i][j] != values[j][i] {
                    return Err(ForecastError::InvalidInput {
                        field: "covariance_matrix".into(),
                        reason: format!(
                            "Not symmetric: [{},{}]={} != [{},{}]={}",
                            i, j, values[i][j], j, i, values[j][i]
                        ),
                    });
                }
            }
        }
        check_positive_semi_definite(&assets, &values, psd_tolerance)?;
        Ok(CovarianceMatrix { assets, values })
    }

    /// Build from per-asset variances and a correlation matrix.
    pub fn from_correlations(
        assets: Vec<String>,
        variances: &[Decimal],
        correlations: &[Vec<Decimal>],
        psd_tolerance: Decimal,
    ) -> ForecastResult<Self> {
        let n = assets.len();
        if variances.len() != n || correlations.len() != n {
            return Err(ForecastError::InvalidInput {
                field: "correlations".into(),
                reason: format!("Expected {} variances and {} correlation rows", n, n),
            });
        }
        let vols: Vec<Decimal> = variances.iter().map(|v| sqrt_decimal(*v)).collect();
        let mut values = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            if correlations[i].len() != n {
                return Err(ForecastError::InvalidInput {
                    field: "correlations".into(),
                    reason: format!("Row {} has {} columns, expected {}", i, correlations[i].len(), n),
                });
            }
            values[i][i] = variances[i];
            for j in (i + 1)..n {
                let rho = correlations[i][j];
                if rho < -Decimal::ONE || rho > Decimal::ONE {
                    return Err(ForecastError::InvalidInput {
                        field: "correlations".into(),
                        reason: format!("Correlation [{},{}]={} outside [-1, 1]", i, j, rho),
                    });
                }
                let cov = rho * vols[i] * vols[j];
                values[i][j] = cov;
                values[j][i] = cov;
            }
        }
        Self::from_parts(assets, values, psd_tolerance)
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn values(&self) -> &[Vec<Decimal>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn index_of(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<Decimal> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i][j])
    }

    pub fn variance(&self, asset: &str) -> Option<Decimal> {
        self.get(asset, asset)
    }

    /// Pearson correlation; `None` when either asset is unknown or has zero
    /// variance.
    pub fn correlation(&self, a: &str, b: &str) -> Option<Decimal> {
        let cov = self.get(a, b)?;
        let denom = sqrt_decimal(self.variance(a)?) * sqrt_decimal(self.variance(b)?);
        if denom.is_zero() {
            None
        } else {
            Some(cov / denom)
        }
    }
}

/// Sample covariance matrix of aligned return histories.
///
/// Every series must have the same length and, when given, the same
/// `period_start`. Off-diagonal entries are computed once and mirrored.
pub fn estimate_covariance(
    histories: &[AssetHistory],
    psd_tolerance: Decimal,
) -> ForecastResult<CovarianceMatrix> {
    if histories.is_empty() {
        return Err(ForecastError::InsufficientData(
            "At least one asset history required".into(),
        ));
    }
    check_aligned(histories)?;

    let n = histories.len();
    let periods = histories[0].returns.len();
    if periods < 2 {
        return Err(ForecastError::InsufficientData(
            "At least 2 aligned periods required for covariance".into(),
        ));
    }

    let means: Vec<Decimal> = histories.iter().map(|h| mean(&h.returns)).collect();
    let mut values = vec![vec![Decimal::ZERO; n]; n];
    for i in 0..n {
        for j in i..n {
            let cov = covariance(
                &histories[i].returns,
                &histories[j].returns,
                means[i],
                means[j],
            );
            values[i][j] = cov;
            values[j][i] = cov;
        }
    }

    let assets = histories.iter().map(|h| h.id.clone()).collect();
    CovarianceMatrix::from_parts(assets, values, psd_tolerance)
}

/// Reject series that cannot be paired period by period.
pub fn check_aligned(histories: &[AssetHistory]) -> ForecastResult<()> {
    let ids: Vec<String> = histories.iter().map(|h| h.id.clone()).collect();
    check_unique(&ids)?;

    let Some(first) = histories.first() else {
        return Ok(());
    };
    for h in &histories[1..] {
        if h.returns.len() != first.returns.len() {
            return Err(ForecastError::InvalidInput {
                field: format!("assets.{}.returns", h.id),
                reason: format!(
                    "Series length {} differs from '{}' length {}",
                    h.returns.len(),
                    first.id,
                    first.returns.len()
                ),
            });
        }
        if let (Some(a), Some(b)) = (first.period_start, h.period_start) {
            if a != b {
                return Err(ForecastError::InvalidInput {
                    field: format!("assets.{}.period_start", h.id),
                    reason: format!("Series starts {} but '{}' starts {}", b, first.id, a),
                });
            }
        }
    }
    Ok(())
}

fn check_unique(assets: &[String]) -> ForecastResult<()> {
    let mut seen = HashSet::new();
    for a in assets {
        if !seen.insert(a.as_str()) {
            return Err(ForecastError::InvalidInput {
                field: "assets".into(),
                reason: format!("Duplicate asset id '{a}'"),
            });
        }
    }
    Ok(())
}

/// Covariance between two series (sample, n-1)
fn covariance(x: &[Decimal], y: &[Decimal], x_mean: Decimal, y_mean: Decimal) -> Decimal {
    let n = x.len();
    if n < 2 {
        return Decimal::ZERO;
    }
    let sum: Decimal = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum();
    sum / Decimal::from((n - 1) as i64)
}

/// LDLᵀ factorisation that tolerates zero pivots.
///
/// A negative pivot, or a zero pivot with a non-zero residual below it, means
/// some weight vector would give the portfolio negative variance.
#[allow(clippy::needless_range_loop)]
fn check_positive_semi_definite(
    assets: &[String],
    a: &[Vec<Decimal>],
    relative_tolerance: Decimal,
) -> ForecastResult<()> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i]).max().unwrap_or(Decimal::ZERO);
    let tol = relative_tolerance * scale.max(Decimal::ONE);

    let mut l = vec![vec![Decimal::ZERO; n]; n];
    let mut d = vec![Decimal::ZERO; n];

    for j in 0..n {
        let mut pivot = a[j][j];
        for k in 0..j {
            pivot -= l[j][k] * l[j][k] * d[k];
        }
        if pivot < -tol {
            return Err(ForecastError::DataIntegrity(format!(
                "Covariance matrix is not positive semi-definite (pivot {} at asset '{}')",
                pivot, assets[j]
            )));
        }

        let zero_pivot = pivot <= tol;
        d[j] = if zero_pivot { Decimal::ZERO } else { pivot };
        l[j][j] = Decimal::ONE;

        for i in (j + 1)..n {
            let mut r = a[i][j];
            for k in 0..j {
                r -= l[i][k] * l[j][k] * d[k];
            }
            if zero_pivot {
                // A pivot p <= tol leaves |r| <= sqrt(p * a_ii) on valid data
                let residual_tol = sqrt_decimal(tol * a[i][i]).max(tol);
                if r.abs() > residual_tol {
                    return Err(ForecastError::DataIntegrity(format!(
                        "Covariance matrix is not positive semi-definite: '{}' has no variance \
                         left but still co-moves with '{}'",
                        assets[j], assets[i]
                    )));
                }
                l[i][j] = Decimal::ZERO;
            } else {
                l[i][j] = r / d[j];
            }
        }
    }
    Ok(())
}

pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}
