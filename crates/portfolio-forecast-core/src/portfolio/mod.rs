pub mod composer;

pub use composer::{compose_portfolio, composite_variance, PortfolioStatistics};
