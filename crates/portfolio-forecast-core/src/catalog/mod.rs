pub mod plan;
pub mod registry;

pub use plan::{Plan, RiskTier};
pub use registry::{AssetUniverse, PlanCatalog, STANDARD_CATALOG_VERSION, WEIGHT_TOLERANCE};
