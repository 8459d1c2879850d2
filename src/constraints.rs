//! # Constraint Solver
//!
//! $$
//! w_{\min} \le w_i \le w_{\max},\qquad \sum_i w_i = 1,\qquad \#\{i : w_i \ne 0\} \le K
//! $$
//!
//! Position limiting, a feasibility pre-check and at most [`MAX_ITERATIONS`]
//! rounds of clip / renormalize / redistribute. The result always sums to one;
//! the bounds are best-effort and the remaining violation is reported.

use impl_new_derive::ImplNew;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::config::ConstraintParams;
use crate::types::WeightVector;

/// Cap on clip/redistribute rounds.
pub const MAX_ITERATIONS: usize = 20;

/// Slack allowed on the max-weight check.
const BOUND_TOLERANCE: f64 = 1e-10;

/// Bounds and position limit applied to a raw allocation.
#[derive(Clone, Copy, Debug, PartialEq, ImplNew)]
pub struct ConstraintSolver {
  pub min_weight: f64,
  pub max_weight: f64,
  /// `None` keeps every asset.
  pub max_positions: Option<usize>,
}

impl From<ConstraintParams> for ConstraintSolver {
  fn from(p: ConstraintParams) -> Self {
    Self::new(p.min_weight, p.max_weight, p.max_positions)
  }
}

/// Output of [`ConstraintSolver::solve`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstrainedWeights {
  pub weights: WeightVector,
  /// Clip/redistribute rounds performed.
  pub iterations: usize,
  /// Max-weight bound met within the iteration cap.
  pub converged: bool,
  /// Effective lower bound when the configured one had to be relaxed.
  pub relaxed_min_weight: Option<f64>,
  /// Symbols removed by the position limit.
  pub dropped: Vec<String>,
  /// Largest distance of a held weight outside its effective bounds.
  pub residual_violation: f64,
}

fn normalize_active(w: &mut [f64], active: &[bool]) {
  let total: f64 = w.iter().sum();
  if total.is_finite() && total > 1e-15 {
    w.iter_mut().for_each(|x| *x /= total);
    return;
  }

  let n = active.iter().filter(|&&a| a).count().max(1) as f64;
  for (x, &a) in w.iter_mut().zip(active.iter()) {
    *x = if a { 1.0 / n } else { 0.0 };
  }
}

impl ConstraintSolver {
  /// Turn `raw` into a normalized allocation that respects the bounds as far
  /// as [`MAX_ITERATIONS`] rounds allow.
  pub fn solve(&self, raw: &WeightVector) -> ConstrainedWeights {
    let symbols: Vec<String> = raw.symbols().map(str::to_string).collect();
    let mut w: Vec<f64> = raw
      .iter()
      .map(|(_, x)| if x.is_finite() { x } else { 0.0 })
      .collect();

    if symbols.is_empty() {
      return ConstrainedWeights {
        weights: WeightVector::new(),
        iterations: 0,
        converged: true,
        relaxed_min_weight: None,
        dropped: Vec::new(),
        residual_violation: 0.0,
      };
    }

    // 1. position limiting
    let mut active = vec![true; w.len()];
    let mut dropped = Vec::new();
    if let Some(k) = self.max_positions {
      if w.len() > k {
        let mut ranked: Vec<usize> = (0..w.len()).collect();
        ranked.sort_by(|&a, &b| w[b].total_cmp(&w[a]).then_with(|| symbols[a].cmp(&symbols[b])));
        for &i in &ranked[k..] {
          active[i] = false;
          w[i] = 0.0;
          dropped.push(symbols[i].clone());
        }
        dropped.sort();
        debug!(kept = k, dropped = dropped.len(), "position limit applied");
      }
    }

    // 2. feasibility pre-check
    let n = active.iter().filter(|&&a| a).count();
    let max_w = self.max_weight;
    let mut min_w = self.min_weight.max(0.0);
    let mut relaxed_min_weight = None;

    if (n as f64) * max_w < 1.0 {
      let relaxed = (1.0 - (n as f64 - 1.0) * max_w).max(0.0);
      min_w = min_w.min(relaxed);
      relaxed_min_weight = Some(min_w);
      warn!(
        n_assets = n,
        max_weight = max_w,
        min_weight = self.min_weight,
        relaxed_min_weight = min_w,
        "max weight makes full allocation infeasible, relaxing min weight"
      );
    }
    if (n as f64) * min_w > 1.0 {
      let relaxed = 1.0 / n as f64;
      warn!(
        n_assets = n,
        min_weight = min_w,
        relaxed_min_weight = relaxed,
        "min weight makes full allocation infeasible, relaxing min weight"
      );
      min_w = relaxed;
      relaxed_min_weight = Some(min_w);
    }

    // 3. iterative satisfaction
    let mut converged = false;
    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
      iterations += 1;

      for (x, &a) in w.iter_mut().zip(active.iter()) {
        if a && *x < min_w {
          *x = min_w;
        }
      }
      normalize_active(&mut w, &active);

      let current_max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      debug!(iteration = iterations, max_weight = current_max, "constraint round");
      if current_max <= max_w + BOUND_TOLERANCE {
        converged = true;
        break;
      }

      let mut excess = 0.0;
      for x in w.iter_mut() {
        if *x > max_w {
          excess += *x - max_w;
          *x = max_w;
        }
      }

      let headroom: f64 = w
        .iter()
        .zip(active.iter())
        .filter(|(x, a)| **a && **x < max_w)
        .map(|(x, _)| max_w - x)
        .sum();
      if headroom <= 0.0 {
        continue;
      }
      for (x, &a) in w.iter_mut().zip(active.iter()) {
        if a && *x < max_w {
          *x += excess * (max_w - *x) / headroom;
        }
      }
    }

    // 4. final normalization
    normalize_active(&mut w, &active);

    let residual_violation = w
      .iter()
      .zip(active.iter())
      .filter(|(_, a)| **a)
      .map(|(&x, _)| (x - max_w).max(min_w - x).max(0.0))
      .fold(0.0, f64::max);

    if !converged {
      warn!(
        iterations,
        residual_violation, "weight bounds still violated after iteration cap"
      );
    }

    ConstrainedWeights {
      weights: WeightVector::from_slices(&symbols, &w),
      iterations,
      converged,
      relaxed_min_weight,
      dropped,
      residual_violation,
    }
  }
}
