pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "statistics")]
pub mod statistics;

#[cfg(feature = "catalog")]
pub mod catalog;

#[cfg(feature = "portfolio")]
pub mod portfolio;

#[cfg(feature = "projection")]
pub mod projection;

#[cfg(feature = "history")]
pub mod history;

#[cfg(feature = "forecast")]
pub mod forecast;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use config::ForecastConfig;
pub use error::ForecastError;
pub use types::*;

/// Standard result type for all forecast operations
pub type ForecastResult<T> = Result<T, ForecastError>;
