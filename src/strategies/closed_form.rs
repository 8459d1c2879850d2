//! # Closed-Form Allocations
//!
//! $$
//! \mathbf w^{\text{mv}} = \frac{\Sigma^{-1}\mathbf 1}{\mathbf 1^\top\Sigma^{-1}\mathbf 1},\qquad
//! \mathbf w^{\text{kelly}} \propto \big(f\,\Sigma^{-1}\boldsymbol\mu\big)_+
//! $$
//!

use super::StrategyKind;
use super::equal_fallback;
use super::long_only;
use super::short_window_fallback;
use super::window_moments;
use crate::stats::invert_covariance;
use crate::stats::mat_vec_mul;
use crate::types::AlignedHistory;
use crate::types::WeightVector;

/// Global minimum-variance weights from the lookback covariance.
///
/// The closed form may short assets; bounds are enforced later by the constraint solver.
pub fn min_variance_weight(history: &AlignedHistory, lookback: usize) -> WeightVector {
  let kind = StrategyKind::MinVariance;
  let symbols = &history.symbols;
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, kind);
  };

  let Some(inv) = invert_covariance(&moments.cov) else {
    return equal_fallback(symbols, kind, "singular covariance matrix");
  };

  let ones = vec![1.0; symbols.len()];
  let raw = mat_vec_mul(&inv, &ones);
  let denom: f64 = raw.iter().sum();
  if !denom.is_finite() || denom.abs() < 1e-15 {
    return equal_fallback(symbols, kind, "degenerate inverse covariance");
  }

  symbols
    .iter()
    .zip(raw.iter())
    .map(|(s, &w)| (s.clone(), w / denom))
    .collect()
}

/// Fractional Kelly weights, long-only and renormalized.
pub fn kelly_weight(history: &AlignedHistory, lookback: usize, fraction: f64) -> WeightVector {
  let kind = StrategyKind::Kelly;
  let symbols = &history.symbols;
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, kind);
  };

  let Some(inv) = invert_covariance(&moments.cov) else {
    return equal_fallback(symbols, kind, "singular covariance matrix");
  };

  let raw: Vec<f64> = mat_vec_mul(&inv, &moments.mean)
    .into_iter()
    .map(|w| w * fraction)
    .collect();

  long_only(symbols, &raw)
    .unwrap_or_else(|| equal_fallback(symbols, kind, "no asset with positive kelly weight"))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::strategies::fixtures::history_from_returns;
  use crate::strategies::fixtures::wiggle;

  #[test]
  #[traced_test]
  fn collinear_assets_fall_back_to_equal_weight() {
    let base = wiggle(40, 0.001, 0.01, 0);
    let double: Vec<f64> = base.iter().map(|r| 2.0 * r).collect();
    let history = history_from_returns(&["A", "B"], &[base.clone(), base]);
    let w = min_variance_weight(&history, 252);

    assert_eq!(w.get("A"), 0.5);
    assert_eq!(w.get("B"), 0.5);
    assert!(logs_contain("singular covariance matrix"));

    let history = history_from_returns(&["A", "B"], &[wiggle(40, 0.001, 0.01, 0), double]);
    let w = kelly_weight(&history, 252, 0.25);
    assert_eq!(w.get("A"), 0.5);
    assert_eq!(w.get("B"), 0.5);
  }

  #[test]
  fn min_variance_matches_two_asset_formula() {
    let a = wiggle(120, 0.0, 0.01, 0);
    let b = wiggle(120, 0.0, 0.02, 4);
    let history = history_from_returns(&["A", "B"], &[a, b]);
    let w = min_variance_weight(&history, 252);

    let returns = history.window_returns(252);
    let cov = crate::stats::sample_covariance_matrix(&returns);
    let (s11, s22, s12) = (cov[0][0], cov[1][1], cov[0][1]);
    let expected_a = (s22 - s12) / (s11 + s22 - 2.0 * s12);

    assert_abs_diff_eq!(w.get("A"), expected_a, epsilon = 1e-9);
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.get("A") > w.get("B"));
  }

  #[test]
  fn kelly_is_long_only_and_normalized() {
    let history = history_from_returns(
      &["UP", "DOWN", "FLAT"],
      &[
        wiggle(100, 0.002, 0.01, 0),
        wiggle(100, -0.002, 0.01, 5),
        wiggle(100, 0.0005, 0.02, 8),
      ],
    );
    let w = kelly_weight(&history, 252, 0.25);

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.iter().all(|(_, x)| x >= 0.0));
    assert!(w.get("UP") > w.get("DOWN"));
  }
}
