pub mod simulation;

pub use simulation::{simulate_growth, GrowthSimulationInput, GrowthSimulationOutput};
