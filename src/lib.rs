//! # portfolio-rs
//!
//! $$
//! \text{prices} \xrightarrow{\text{align}} \{\mathbf w^{(k)}\} \xrightarrow{\text{blend}} \mathbf w
//! \xrightarrow{\text{constrain}} \mathbf w^\* \xrightarrow{\text{risk}} \mathcal R
//! $$
//!
//! Multi-strategy portfolio construction: weighting strategies, a linear
//! strategy blend, a bounded constraint solver and a historical risk report.
//! Everything is synchronous and pure; see [`engine::PortfolioEngine`] for the
//! entry point.

pub mod combiner;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod returns;
pub mod risk;
pub mod solver;
pub mod stats;
pub mod strategies;
pub mod types;

pub use crate::config::StrategyConfig;
pub use engine::Allocation;
pub use engine::PortfolioEngine;
pub use error::DataQualityError;
pub use error::PortfolioError;
pub use risk::RiskCalculator;
pub use risk::RiskMetricsReport;
pub use strategies::StrategyKind;
pub use types::PriceHistory;
pub use types::PriceSeries;
pub use types::WeightVector;
