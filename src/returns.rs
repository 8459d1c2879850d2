//! # Returns
//!
//! $$
//! r_t = \frac{P_t - P_{t-1}}{P_{t-1}},\qquad
//! R_T = \prod_{t\le T}(1+r_t) - 1
//! $$
//!
//! Periodic, cumulative and annualized returns from price histories.

use chrono::NaiveDate;

use crate::error::DataQualityError;
use crate::types::PriceSeries;

fn check_prices(prices: &[f64]) -> Result<(), DataQualityError> {
  if prices.len() < 2 {
    return Err(DataQualityError::InsufficientData {
      required: 2,
      actual: prices.len(),
    });
  }
  for (index, &price) in prices.iter().enumerate() {
    if !price.is_finite() {
      return Err(DataQualityError::NonFinitePrice { index });
    }
    if price <= 0.0 {
      return Err(DataQualityError::NonPositivePrice { index, price });
    }
  }
  Ok(())
}

/// Simple period returns `(p[i] - p[i-1]) / p[i-1]`; one shorter than `prices`.
pub fn simple_returns(prices: &[f64]) -> Result<Vec<f64>, DataQualityError> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}

/// Natural-log differences `ln(p[i] / p[i-1])`.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>, DataQualityError> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Simple returns stamped with the date each period ends on.
pub fn dated_returns(series: &PriceSeries) -> Result<Vec<(NaiveDate, f64)>, DataQualityError> {
  let returns = simple_returns(&series.prices())?;
  Ok(
    series
      .dates()
      .into_iter()
      .skip(1)
      .zip(returns)
      .collect(),
  )
}

/// Running product of `(1 + r)` minus one.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
  let mut growth = 1.0;
  returns
    .iter()
    .map(|&r| {
      growth *= 1.0 + r;
      growth - 1.0
    })
    .collect()
}

/// Compounded return over the whole series, `0.0` for an empty one.
pub fn total_return(returns: &[f64]) -> f64 {
  returns.iter().fold(1.0, |acc, &r| acc * (1.0 + r)) - 1.0
}

/// Growth of one unit invested at the start: `[1, (1+r_1), (1+r_1)(1+r_2), ...]`.
pub fn value_curve(returns: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(returns.len() + 1);
  out.push(1.0);
  for r in cumulative_returns(returns) {
    out.push(1.0 + r);
  }
  out
}

/// `(1 + total_return)^(365 / days) - 1`; `0.0` when `days <= 0`.
pub fn annualized_return(total_return: f64, days: f64) -> f64 {
  if days <= 0.0 {
    return 0.0;
  }
  (1.0 + total_return).powf(365.0 / days) - 1.0
}

/// Annualize a compounded return earned over `periods` sampling periods.
pub fn annualized_return_from_periods(
  total_return: f64,
  periods: usize,
  periods_per_year: f64,
) -> f64 {
  if periods == 0 || periods_per_year <= 0.0 {
    return 0.0;
  }
  (1.0 + total_return).powf(periods_per_year / periods as f64) - 1.0
}

/// Return series of a book rebalanced to `weights` every period.
///
/// `asset_returns[i][t]` is the return of asset `i` in period `t`; all series
/// must share the same length.
pub fn portfolio_returns(weights: &[f64], asset_returns: &[Vec<f64>]) -> Vec<f64> {
  let n_periods = asset_returns.iter().map(Vec::len).min().unwrap_or(0);

  (0..n_periods)
    .map(|t| {
      weights
        .iter()
        .zip(asset_returns.iter())
        .map(|(&wi, r)| wi * r[t])
        .sum()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn simple_returns_need_two_prices() {
    assert_eq!(
      simple_returns(&[100.0]),
      Err(DataQualityError::InsufficientData {
        required: 2,
        actual: 1
      })
    );
  }

  #[test]
  fn log_returns_reject_non_positive_prices() {
    assert!(matches!(
      log_returns(&[100.0, 0.0, 101.0]),
      Err(DataQualityError::NonPositivePrice { index: 1, .. })
    ));
  }

  #[test]
  fn log_returns_are_log_of_gross_simple_returns() {
    let prices = [100.0, 101.0, 100.5, 102.0];
    let simple = simple_returns(&prices).unwrap();
    let log = log_returns(&prices).unwrap();

    assert_eq!(simple.len(), 3);
    assert_abs_diff_eq!(simple[0], 0.01, epsilon = 1e-12);
    for (s, l) in simple.iter().zip(log.iter()) {
      assert_abs_diff_eq!((1.0 + s).ln(), *l, epsilon = 1e-12);
      assert_abs_diff_eq!(*s, *l, epsilon = 2e-4);
    }
  }

  #[test]
  fn cumulative_return_round_trips_to_price_ratio() {
    let prices = [50.0, 52.5, 49.0, 55.25, 60.0, 58.1];
    let cumulative = cumulative_returns(&simple_returns(&prices).unwrap());
    let last = *cumulative.last().unwrap();
    assert_relative_eq!(last, prices[5] / prices[0] - 1.0, max_relative = 1e-12);
  }

  #[test]
  fn annualized_return_handles_non_positive_days() {
    assert_eq!(annualized_return(0.2, 0.0), 0.0);
    assert_eq!(annualized_return(0.2, -5.0), 0.0);
    assert_relative_eq!(annualized_return(0.21, 730.0), 0.1, max_relative = 1e-12);
  }

  #[test]
  fn portfolio_returns_weight_each_period() {
    let rets = vec![vec![0.01, 0.02], vec![-0.01, 0.04]];
    let port = portfolio_returns(&[0.5, 0.5], &rets);
    assert_abs_diff_eq!(port[0], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(port[1], 0.03, epsilon = 1e-15);
  }

  #[test]
  fn value_curve_starts_at_one() {
    let curve = value_curve(&[0.1, -0.5]);
    assert_eq!(curve.len(), 3);
    assert_abs_diff_eq!(curve[0], 1.0);
    assert_abs_diff_eq!(curve[2], 0.55, epsilon = 1e-12);
  }
}
