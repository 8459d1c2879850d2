//! # Risk
//!
//! $$
//! S = \frac{\bar r\,P - r_f}{s\sqrt{P}}
//! $$
//!
//! Risk and performance metrics of a return series, optionally against a benchmark.
//! All functions are pure; [`RiskCalculator`] only bundles the shared parameters.

pub mod drawdown;
pub mod ratios;
pub mod relative;
pub mod report;
pub mod tail;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;

pub use drawdown::Drawdown;
pub use drawdown::max_drawdown;
pub use drawdown::max_drawdown_from_returns;
pub use ratios::annualized_volatility;
pub use ratios::calmar_ratio;
pub use ratios::downside_deviation;
pub use ratios::sharpe_ratio;
pub use ratios::sortino_ratio;
pub use relative::beta;
pub use relative::correlation;
pub use relative::information_ratio;
pub use relative::tracking_error;
pub use report::BenchmarkMetrics;
pub use report::RiskMetricsReport;
pub use report::TailRisk;
pub use tail::conditional_value_at_risk;
pub use tail::value_at_risk;

use crate::error::DataQualityError;

/// Sentinel returned by ratios whose denominator vanishes with a positive numerator.
pub const INFINITE_RATIO: f64 = f64::INFINITY;

/// Annualization factor for daily observations.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annual risk-free rate used when none is configured.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Estimator used for Value-at-Risk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
  /// Empirical quantile of the observed returns.
  #[default]
  Historical,
  /// Gaussian quantile from the sample mean and standard deviation.
  Parametric,
}

impl VarMethod {
  /// Parse a string into a [`VarMethod`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "parametric" | "gaussian" | "normal" => Self::Parametric,
      _ => Self::Historical,
    }
  }
}

/// Stateless bundle of the parameters every metric needs.
#[derive(Clone, Copy, Debug, PartialEq, ImplNew)]
pub struct RiskCalculator {
  /// Annual risk-free rate.
  pub risk_free_rate: f64,
  /// Sampling periods per year (252 for daily data).
  pub periods_per_year: f64,
  /// Estimator for VaR/CVaR.
  pub var_method: VarMethod,
}

impl Default for RiskCalculator {
  fn default() -> Self {
    Self {
      risk_free_rate: DEFAULT_RISK_FREE_RATE,
      periods_per_year: TRADING_DAYS_PER_YEAR,
      var_method: VarMethod::Historical,
    }
  }
}

impl RiskCalculator {
  pub fn annualized_volatility(&self, returns: &[f64]) -> f64 {
    annualized_volatility(returns, self.periods_per_year)
  }

  pub fn sharpe(&self, returns: &[f64]) -> f64 {
    sharpe_ratio(returns, self.risk_free_rate, self.periods_per_year)
  }

  pub fn sortino(&self, returns: &[f64]) -> f64 {
    sortino_ratio(returns, self.risk_free_rate, self.periods_per_year)
  }

  pub fn calmar(&self, returns: &[f64]) -> f64 {
    calmar_ratio(returns, self.periods_per_year)
  }

  pub fn max_drawdown(&self, values: &[(NaiveDate, f64)]) -> Result<Drawdown, DataQualityError> {
    max_drawdown(values)
  }

  pub fn value_at_risk(&self, returns: &[f64], confidence: f64) -> f64 {
    value_at_risk(returns, confidence, self.var_method)
  }

  pub fn conditional_value_at_risk(&self, returns: &[f64], confidence: f64) -> f64 {
    conditional_value_at_risk(returns, confidence, self.var_method)
  }

  pub fn beta(&self, asset: &[f64], market: &[f64]) -> f64 {
    beta(asset, market)
  }

  pub fn correlation(&self, x: &[f64], y: &[f64]) -> f64 {
    correlation(x, y)
  }

  pub fn tracking_error(&self, portfolio: &[f64], benchmark: &[f64]) -> f64 {
    tracking_error(portfolio, benchmark, self.periods_per_year)
  }

  pub fn information_ratio(&self, portfolio: &[f64], benchmark: &[f64]) -> f64 {
    information_ratio(portfolio, benchmark, self.periods_per_year)
  }
}
