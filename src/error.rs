//! # Errors
//!
//! $$
//! \text{DataQuality} \cup \text{DegenerateAllocation} \cup \text{Config}
//! $$
//!
//! Only data-quality failures, degenerate allocations and configuration
//! problems reach the caller. Numerical trouble (singular covariance,
//! optimizer non-convergence) and infeasible bounds are recovered locally.

use thiserror::Error;

/// Input data does not satisfy the invariants of a price history.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataQualityError {
  #[error("insufficient data: need at least {required} observations, got {actual}")]
  InsufficientData { required: usize, actual: usize },

  #[error("non-positive price {price} at index {index}")]
  NonPositivePrice { index: usize, price: f64 },

  #[error("non-finite price at index {index}")]
  NonFinitePrice { index: usize },

  #[error("price series for '{symbol}' is empty")]
  EmptySeries { symbol: String },

  #[error("timestamps for '{symbol}' are not strictly increasing at index {index}")]
  UnorderedTimestamps { symbol: String, index: usize },

  #[error("asset series share no common timestamps")]
  NoCommonHistory,

  #[error("price history contains no assets")]
  EmptyUniverse,
}

/// Caller-visible failure of a portfolio computation.
#[derive(Error, Debug)]
pub enum PortfolioError {
  #[error(transparent)]
  DataQuality(#[from] DataQualityError),

  #[error("combined strategy weights are degenerate (sum = {sum})")]
  DegenerateAllocation { sum: f64 },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("failed to load configuration: {0}")]
  ConfigLoad(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_quality_errors_convert_into_portfolio_errors() {
    fn fails() -> Result<()> {
      Err(DataQualityError::InsufficientData {
        required: 2,
        actual: 1,
      })?;
      Ok(())
    }

    let err = fails().unwrap_err();
    assert!(matches!(
      err,
      PortfolioError::DataQuality(DataQualityError::InsufficientData { .. })
    ));
    assert_eq!(
      err.to_string(),
      "insufficient data: need at least 2 observations, got 1"
    );
  }
}
