//! # Risk-Adjusted Ratios
//!
//! $$
//! \text{Sortino} = \frac{\bar r P - r_f}{\sigma_- \sqrt P},\quad \sigma_- = \sqrt{\tfrac{1}{T}\textstyle\sum_t \min(r_t,0)^2},\qquad
//! \text{Calmar} = \frac{R_{ann}}{|\text{MDD}|}
//! $$
//!

use super::INFINITE_RATIO;
use super::drawdown::max_drawdown_from_returns;
use crate::returns::annualized_return_from_periods;
use crate::returns::total_return;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Annualized volatility below which a ratio's denominator is treated as zero.
const VOL_EPS: f64 = 1e-12;

fn degenerate_ratio(numerator: f64) -> f64 {
  if numerator > 0.0 {
    INFINITE_RATIO
  } else if numerator < 0.0 {
    -INFINITE_RATIO
  } else {
    0.0
  }
}

pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
  sample_std(returns) * periods_per_year.sqrt()
}

/// `(annualized mean - risk_free) / annualized volatility`.
///
/// `0.0` for fewer than two returns; a signed infinite sentinel when the
/// series has no volatility but a non-zero excess return.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
  if returns.len() < 2 {
    return 0.0;
  }

  let excess = sample_mean(returns) * periods_per_year - risk_free_rate;
  let vol = annualized_volatility(returns, periods_per_year);
  if vol < VOL_EPS {
    return degenerate_ratio(excess);
  }
  excess / vol
}

/// Sharpe with the downside semideviation `sqrt(mean(min(r, 0)^2))` in the
/// denominator, taken over every period.
///
/// [`INFINITE_RATIO`] when no return is negative.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
  if returns.len() < 2 {
    return 0.0;
  }
  if returns.iter().all(|&r| r >= 0.0) {
    return INFINITE_RATIO;
  }

  let excess = sample_mean(returns) * periods_per_year - risk_free_rate;
  let downside_dev = downside_deviation(returns) * periods_per_year.sqrt();
  if downside_dev < VOL_EPS {
    return degenerate_ratio(excess);
  }
  excess / downside_dev
}

/// Root mean square of the negative part of `returns`.
pub fn downside_deviation(returns: &[f64]) -> f64 {
  if returns.is_empty() {
    return 0.0;
  }
  let sum_sq: f64 = returns.iter().map(|&r| r.min(0.0).powi(2)).sum();
  (sum_sq / returns.len() as f64).sqrt()
}

/// Annualized return over maximum drawdown magnitude.
///
/// Needs at least a year of periods, else `0.0`.
pub fn calmar_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
  if periods_per_year <= 0.0 || (returns.len() as f64) < periods_per_year {
    return 0.0;
  }

  let annual = annualized_return_from_periods(total_return(returns), returns.len(), periods_per_year);
  let magnitude = max_drawdown_from_returns(returns);
  if magnitude <= 0.0 {
    return degenerate_ratio(annual);
  }
  annual / magnitude
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::risk::TRADING_DAYS_PER_YEAR;

  #[test]
  fn sharpe_of_constant_positive_returns_is_infinite_not_nan() {
    let returns = vec![0.001; 300];
    let s = sharpe_ratio(&returns, 0.05, TRADING_DAYS_PER_YEAR);
    assert!(!s.is_nan());
    assert!(s > 1e6);
  }

  #[test]
  fn sharpe_needs_two_returns() {
    assert_eq!(sharpe_ratio(&[0.01], 0.05, TRADING_DAYS_PER_YEAR), 0.0);
    assert_eq!(sharpe_ratio(&[], 0.05, TRADING_DAYS_PER_YEAR), 0.0);
  }

  #[test]
  fn sharpe_matches_closed_form() {
    let returns = [0.01, -0.005, 0.02, 0.0, 0.004];
    let mean = returns.iter().sum::<f64>() / 5.0;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 4.0;
    let expected = (mean * 252.0 - 0.02) / (var.sqrt() * 252.0_f64.sqrt());
    assert_abs_diff_eq!(sharpe_ratio(&returns, 0.02, 252.0), expected, epsilon = 1e-12);
  }

  #[test]
  fn sortino_without_downside_is_sentinel() {
    assert_eq!(
      sortino_ratio(&[0.01, 0.02, 0.0], 0.05, TRADING_DAYS_PER_YEAR),
      INFINITE_RATIO
    );
  }

  #[test]
  fn sortino_exceeds_sharpe_for_positively_skewed_returns() {
    let returns = [0.03, -0.01, 0.025, -0.012, 0.04, 0.002, -0.008];
    let sharpe = sharpe_ratio(&returns, 0.0, TRADING_DAYS_PER_YEAR);
    let sortino = sortino_ratio(&returns, 0.0, TRADING_DAYS_PER_YEAR);
    assert!(sortino > sharpe);
  }

  #[test]
  fn single_loss_gives_finite_sortino() {
    let returns = [0.01, 0.02, -0.01, 0.015];
    let s = sortino_ratio(&returns, 0.0, TRADING_DAYS_PER_YEAR);
    assert!(s.is_finite());
    assert!(s > 0.0);
    assert_abs_diff_eq!(downside_deviation(&returns), 0.005, epsilon = 1e-12);
  }

  #[test]
  fn calmar_needs_a_year_of_data() {
    assert_eq!(calmar_ratio(&[0.01; 100], TRADING_DAYS_PER_YEAR), 0.0);
  }

  #[test]
  fn calmar_without_drawdown_is_sentinel() {
    assert_eq!(calmar_ratio(&[0.001; 260], TRADING_DAYS_PER_YEAR), INFINITE_RATIO);
  }

  #[test]
  fn calmar_divides_by_drawdown() {
    let mut returns = vec![0.001; 252];
    returns[100] = -0.1;
    let c = calmar_ratio(&returns, TRADING_DAYS_PER_YEAR);
    let annual = total_return(&returns);
    assert_abs_diff_eq!(c, annual / 0.1, epsilon = 1e-9);
  }
}
