//! # Solver-Based Allocations
//!
//! $$
//! \max_{\mathbf w\in\Delta}\ \frac{P\,\mathbf w^\top\boldsymbol\mu - r_f}{\sqrt{P\,\mathbf w^\top\Sigma\mathbf w}},\qquad
//! \max_{\mathbf w\in\Delta}\ P\Big(\mathbf w^\top\boldsymbol\mu - \tfrac{\lambda}{2}\mathbf w^\top\Sigma\mathbf w\Big),\qquad
//! \max_{\mathbf w\in\Delta}\ \frac{\mathbf w^\top\boldsymbol\sigma}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Long-only (`0 <= w_i <= 1`), fully-invested allocations solved through a
//! [`Minimizer`]. A solve that does not converge is never used.

use tracing::debug;
use tracing::warn;

use super::StrategyKind;
use super::equal_fallback;
use super::heuristic::inverse_volatility_weight;
use super::long_only;
use super::short_window_fallback;
use super::window_moments;
use crate::solver::ConstrainedProblem;
use crate::solver::Minimizer;
use crate::stats::dot;
use crate::stats::mat_vec_mul;
use crate::types::AlignedHistory;
use crate::types::WeightVector;

/// Annualized variance below which a portfolio is treated as riskless.
const MIN_VARIANCE: f64 = 1e-18;

fn quad_form(cov: &[Vec<f64>], w: &[f64]) -> f64 {
  dot(w, &mat_vec_mul(cov, w))
}

/// Solve on the long-only simplex; `None` unless the solver converged to a usable vector.
fn solve_on_simplex<F>(
  minimizer: &dyn Minimizer,
  kind: StrategyKind,
  symbols: &[String],
  objective: F,
) -> Option<WeightVector>
where
  F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
{
  let problem = ConstrainedProblem::long_only_simplex(objective, symbols.len());
  let res = minimizer.minimize(problem);
  debug!(
    strategy = kind.name(),
    iterations = res.iterations,
    converged = res.converged,
    objective = res.objective_value,
    "solver finished"
  );

  if !res.converged {
    warn!(
      strategy = kind.name(),
      iterations = res.iterations,
      "optimizer did not converge"
    );
    return None;
  }
  long_only(symbols, &res.solution)
}

/// Long-only tangency portfolio maximizing the annualized Sharpe ratio.
pub fn max_sharpe_weight(
  history: &AlignedHistory,
  lookback: usize,
  risk_free_rate: f64,
  periods_per_year: f64,
  minimizer: &dyn Minimizer,
) -> WeightVector {
  let kind = StrategyKind::MaxSharpe;
  let symbols = &history.symbols;
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, kind);
  };
  if moments.cov.iter().enumerate().all(|(i, row)| row[i] <= MIN_VARIANCE) {
    return equal_fallback(symbols, kind, "zero variance in every asset");
  }

  let mu = moments.mean;
  let cov = moments.cov;
  let objective = move |w: &[f64]| {
    let ann_ret = dot(w, &mu) * periods_per_year;
    let ann_var = quad_form(&cov, w) * periods_per_year;
    if ann_var <= MIN_VARIANCE {
      return f64::NAN;
    }
    -(ann_ret - risk_free_rate) / ann_var.sqrt()
  };

  solve_on_simplex(minimizer, kind, symbols, objective)
    .unwrap_or_else(|| equal_fallback(symbols, kind, "max-sharpe solve failed"))
}

/// Long-only maximizer of the annualized mean-variance utility.
pub fn mean_variance_weight(
  history: &AlignedHistory,
  lookback: usize,
  risk_aversion: f64,
  periods_per_year: f64,
  minimizer: &dyn Minimizer,
) -> WeightVector {
  let kind = StrategyKind::MeanVariance;
  let symbols = &history.symbols;
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, kind);
  };

  let mu = moments.mean;
  let cov = moments.cov;
  let objective = move |w: &[f64]| {
    let ann_ret = dot(w, &mu) * periods_per_year;
    let ann_var = quad_form(&cov, w) * periods_per_year;
    -(ann_ret - 0.5 * risk_aversion * ann_var)
  };

  solve_on_simplex(minimizer, kind, symbols, objective)
    .unwrap_or_else(|| equal_fallback(symbols, kind, "mean-variance solve failed"))
}

/// Long-only maximizer of the diversification ratio; inverse volatility on failure.
pub fn max_diversification_weight(
  history: &AlignedHistory,
  lookback: usize,
  minimizer: &dyn Minimizer,
) -> WeightVector {
  let kind = StrategyKind::MaxDiversification;
  let symbols = &history.symbols;
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, kind);
  };

  let sigmas: Vec<f64> = (0..symbols.len())
    .map(|i| moments.cov[i][i].max(0.0).sqrt())
    .collect();
  if sigmas.iter().any(|&s| s * s <= MIN_VARIANCE) {
    warn!(strategy = kind.name(), "zero-variance asset, using inverse volatility");
    return inverse_volatility_weight(history, lookback);
  }

  let cov = moments.cov;
  let objective = move |w: &[f64]| {
    let var = quad_form(&cov, w);
    if var <= MIN_VARIANCE {
      return f64::NAN;
    }
    -dot(w, &sigmas) / var.sqrt()
  };

  solve_on_simplex(minimizer, kind, symbols, objective).unwrap_or_else(|| {
    warn!(strategy = kind.name(), "falling back to inverse volatility");
    inverse_volatility_weight(history, lookback)
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::solver::Minimization;
  use crate::solver::NelderMeadMinimizer;
  use crate::strategies::fixtures::history_from_returns;
  use crate::strategies::fixtures::wiggle;

  /// Minimizer that always gives up at its starting point.
  struct GiveUp;

  impl Minimizer for GiveUp {
    fn minimize(&self, problem: ConstrainedProblem) -> Minimization {
      Minimization {
        solution: vec![0.9; problem.dim()],
        objective_value: 0.0,
        iterations: 1,
        converged: false,
      }
    }
  }

  fn two_asset_history() -> AlignedHistory {
    history_from_returns(
      &["GOOD", "POOR"],
      &[wiggle(150, 0.0015, 0.01, 0), wiggle(150, 0.0001, 0.01, 4)],
    )
  }

  #[test]
  fn max_sharpe_tilts_toward_better_risk_adjusted_asset() {
    let w = max_sharpe_weight(
      &two_asset_history(),
      252,
      0.0,
      252.0,
      &NelderMeadMinimizer::default(),
    );
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.get("GOOD") > w.get("POOR"));
  }

  #[test]
  #[traced_test]
  fn non_converged_max_sharpe_falls_back_to_equal_weight() {
    let w = max_sharpe_weight(&two_asset_history(), 252, 0.0, 252.0, &GiveUp);
    assert_eq!(w.get("GOOD"), 0.5);
    assert_eq!(w.get("POOR"), 0.5);
    assert!(logs_contain("optimizer did not converge"));
    assert!(logs_contain("falling back to equal weight"));
  }

  #[test]
  fn mean_variance_with_high_aversion_approaches_min_variance() {
    let history = history_from_returns(
      &["LOW", "HIGH"],
      &[wiggle(150, 0.0005, 0.005, 0), wiggle(150, 0.0005, 0.03, 4)],
    );
    let w = mean_variance_weight(&history, 252, 50.0, 252.0, &NelderMeadMinimizer::default());
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.get("LOW") > 0.8);
  }

  #[test]
  fn max_diversification_falls_back_to_inverse_volatility() {
    let history = two_asset_history();
    let w = max_diversification_weight(&history, 252, &GiveUp);
    let iv = inverse_volatility_weight(&history, 252);
    assert_eq!(w, iv);
  }

  #[test]
  fn max_diversification_is_long_only() {
    let history = history_from_returns(
      &["A", "B", "C"],
      &[
        wiggle(120, 0.0, 0.01, 0),
        wiggle(120, 0.0, 0.02, 3),
        wiggle(120, 0.0, 0.015, 7),
      ],
    );
    let w = max_diversification_weight(&history, 252, &NelderMeadMinimizer::default());
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.iter().all(|(_, x)| (0.0..=1.0).contains(&x)));
  }
}
