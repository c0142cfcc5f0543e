pub mod asset_stats;
pub mod covariance;

pub use asset_stats::{check_returns, compute_asset_statistics, AssetHistory, AssetStatistics};
pub use covariance::{check_aligned, estimate_covariance, CovarianceMatrix};
