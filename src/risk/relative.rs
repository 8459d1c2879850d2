//! # Benchmark-Relative Metrics
//!
//! $$
//! \beta = \frac{\operatorname{Cov}(r_a, r_m)}{\operatorname{Var}(r_m)},\qquad
//! \mathrm{TE} = s(r_p - r_b)\sqrt P
//! $$
//!

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::stats::align_return_series;
use crate::stats::covariance;
use crate::stats::pearson;
use crate::stats::sample_mean;
use crate::stats::sample_std;
use crate::stats::sample_variance;

fn aligned_pair(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
  let mut aligned = align_return_series(&[x.to_vec(), y.to_vec()]);
  let y = aligned.pop().unwrap_or_default();
  let x = aligned.pop().unwrap_or_default();
  (x, y)
}

/// Join two dated series on their common dates, preserving date order.
pub fn align_dated(x: &[(NaiveDate, f64)], y: &[(NaiveDate, f64)]) -> (Vec<f64>, Vec<f64>) {
  let by_date: BTreeMap<NaiveDate, f64> = y.iter().copied().collect();
  x.iter()
    .filter_map(|(d, xv)| by_date.get(d).map(|yv| (*xv, *yv)))
    .unzip()
}

/// Market beta of `asset` against `market` over their common tail.
///
/// `1.0` when fewer than two aligned points exist or the market has no variance.
pub fn beta(asset: &[f64], market: &[f64]) -> f64 {
  let (a, m) = aligned_pair(asset, market);
  if a.len() < 2 {
    return 1.0;
  }

  let var_m = sample_variance(&m, sample_mean(&m));
  if var_m < 1e-15 {
    return 1.0;
  }
  covariance(&a, &m) / var_m
}

/// Pearson correlation after dropping periods where either value is missing (non-finite).
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
  let (xs, ys): (Vec<f64>, Vec<f64>) = x
    .iter()
    .zip(y.iter())
    .filter(|(a, b)| a.is_finite() && b.is_finite())
    .map(|(a, b)| (*a, *b))
    .unzip();

  if xs.len() < 2 {
    return 0.0;
  }
  pearson(&xs, &ys)
}

/// Period-by-period `portfolio - benchmark` over the common tail.
pub fn excess_returns(portfolio: &[f64], benchmark: &[f64]) -> Vec<f64> {
  let (p, b) = aligned_pair(portfolio, benchmark);
  p.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

/// Annualized standard deviation of excess returns.
pub fn tracking_error(portfolio: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
  let excess = excess_returns(portfolio, benchmark);
  if excess.len() < 2 {
    return 0.0;
  }
  sample_std(&excess) * periods_per_year.sqrt()
}

/// Annualized mean excess return per unit of tracking error; `0.0` without tracking error.
pub fn information_ratio(portfolio: &[f64], benchmark: &[f64], periods_per_year: f64) -> f64 {
  let excess = excess_returns(portfolio, benchmark);
  let te = tracking_error(portfolio, benchmark, periods_per_year);
  if te < 1e-12 {
    return 0.0;
  }
  sample_mean(&excess) * periods_per_year / te
}
