pub mod grid;
pub mod service;

pub use grid::{ForecastGrid, HorizonForecast, PlanFailure, PlanForecast, ScenarioForecast};
pub use service::{estimate_base_statistics, BaseStatistics, ForecastRequest, ForecastService};
