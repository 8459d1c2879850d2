//! # Tail Risk
//!
//! $$
//! \mathrm{VaR}_c = Q_{1-c}(r),\qquad \mathrm{CVaR}_c = \mathbb E[r \mid r \le \mathrm{VaR}_c]
//! $$
//!
//! VaR is the signed return quantile, so losses are negative and
//! `VaR_99 <= VaR_95` for the same sample.

use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use super::VarMethod;
use crate::stats::percentile;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Observations below which tail estimates are reported as `0.0`.
pub const MIN_TAIL_OBSERVATIONS: usize = 20;

/// Value-at-Risk at `confidence` (e.g. `0.95`).
pub fn value_at_risk(returns: &[f64], confidence: f64, method: VarMethod) -> f64 {
  if returns.len() < MIN_TAIL_OBSERVATIONS || !(0.0..1.0).contains(&confidence) {
    return 0.0;
  }

  let q = 1.0 - confidence;
  match method {
    VarMethod::Historical => percentile(returns, q),
    VarMethod::Parametric => {
      let mean = sample_mean(returns);
      let sd = sample_std(returns);
      mean + sd * Normal::default().inverse_cdf(q)
    }
  }
}

/// Mean of the returns at or below the VaR at `confidence`.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64, method: VarMethod) -> f64 {
  if returns.len() < MIN_TAIL_OBSERVATIONS {
    return 0.0;
  }

  let var = value_at_risk(returns, confidence, method);
  let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
  if tail.is_empty() {
    var
  } else {
    sample_mean(&tail)
  }
}
