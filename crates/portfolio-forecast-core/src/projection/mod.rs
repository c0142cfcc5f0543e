pub mod horizon;
pub mod scenario;

pub use horizon::{project_horizon, project_periods, Horizon, ProjectedDistribution};
pub use scenario::{calibrate, Scenario, ScenarioBands};
