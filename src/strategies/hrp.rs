//! # Hierarchical Risk Parity
//!
//! $$
//! d_{ij} = \sqrt{\tfrac{1}{2}(1-\rho_{ij})},\qquad
//! \alpha = \frac{\sigma^2_R}{\sigma^2_L + \sigma^2_R}
//! $$
//!
//! The lookback window is clustered by single linkage on the correlation
//! distance. The dendrogram's leaf order is then split in halves recursively,
//! each half receiving a share inversely proportional to the variance of its
//! inverse-variance sub-portfolio.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;

use super::StrategyKind;
use super::equal_fallback;
use super::short_window_fallback;
use super::window_moments;
use crate::types::AlignedHistory;
use crate::types::WeightVector;

/// Variance below which an asset counts as riskless.
const VARIANCE_FLOOR: f64 = 1e-15;

/// Node of the single-linkage dendrogram over asset indices.
#[derive(Clone, Debug, PartialEq)]
enum Cluster {
  Leaf(usize),
  Merge {
    left: Box<Cluster>,
    right: Box<Cluster>,
    height: f64,
  },
}

impl Cluster {
  /// Leaf indices, left subtree first.
  fn leaves(&self) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      match node {
        Cluster::Leaf(i) => out.push(*i),
        Cluster::Merge { left, right, .. } => {
          stack.push(right);
          stack.push(left);
        }
      }
    }
    out
  }

  fn height(&self) -> f64 {
    match self {
      Cluster::Leaf(_) => 0.0,
      Cluster::Merge { height, .. } => *height,
    }
  }
}

/// HRP weights from the lookback covariance.
pub fn hrp_weight(history: &AlignedHistory, lookback: usize) -> WeightVector {
  let symbols = &history.symbols;
  let n = symbols.len();
  if n <= 1 {
    return WeightVector::equal(symbols);
  }
  let Some(moments) = window_moments(history, lookback) else {
    return short_window_fallback(symbols, StrategyKind::Hrp);
  };

  let cov = DMatrix::from_fn(n, n, |i, j| moments.cov[i][j]);
  if cov.diagonal().iter().all(|&v| v <= VARIANCE_FLOOR) {
    return equal_fallback(symbols, StrategyKind::Hrp, "no asset has variance in the window");
  }

  let Some(tree) = single_linkage(&correlation_distance(&cov)) else {
    return WeightVector::equal(symbols);
  };
  let order = tree.leaves();
  debug!(?order, height = tree.height(), "hrp cluster tree");

  let weights = bisect(&order, &cov);
  WeightVector::from_slices(symbols, weights.as_slice())
    .normalized()
    .unwrap_or_else(|| equal_fallback(symbols, StrategyKind::Hrp, "degenerate bisection weights"))
}

/// `sqrt((1 - rho) / 2)`; assets without variance are treated as uncorrelated.
fn correlation_distance(cov: &DMatrix<f64>) -> DMatrix<f64> {
  let sd = cov.diagonal().map(|v| v.max(0.0).sqrt());
  DMatrix::from_fn(cov.nrows(), cov.ncols(), |i, j| {
    if i == j {
      return 0.0;
    }
    let denom = sd[i] * sd[j];
    let rho = if denom > VARIANCE_FLOOR {
      (cov[(i, j)] / denom).clamp(-1.0, 1.0)
    } else {
      0.0
    };
    ((1.0 - rho) / 2.0).sqrt()
  })
}

/// Agglomerate the closest pair of clusters until one remains. The distance
/// between clusters is the smallest distance between their members.
fn single_linkage(dist: &DMatrix<f64>) -> Option<Cluster> {
  let mut clusters: Vec<(Cluster, Vec<usize>)> = (0..dist.nrows())
    .map(|i| (Cluster::Leaf(i), vec![i]))
    .collect();

  while clusters.len() > 1 {
    let mut closest = (0, 1, f64::INFINITY);
    for a in 0..clusters.len() {
      for b in (a + 1)..clusters.len() {
        let d = clusters[a]
          .1
          .iter()
          .flat_map(|&i| clusters[b].1.iter().map(move |&j| dist[(i, j)]))
          .fold(f64::INFINITY, f64::min);
        if d < closest.2 {
          closest = (a, b, d);
        }
      }
    }

    let (a, b, height) = closest;
    let (right, right_members) = clusters.remove(b);
    let (left, mut members) = clusters.remove(a);
    members.extend(right_members);
    debug!(height, size = members.len(), "hrp merge");

    let merged = Cluster::Merge {
      left: Box::new(left),
      right: Box::new(right),
      height,
    };
    clusters.insert(a, (merged, members));
  }

  clusters.pop().map(|(tree, _)| tree)
}

/// Split `order` in halves until single assets remain, scaling each half by
/// the other half's share of the combined cluster variance.
fn bisect(order: &[usize], cov: &DMatrix<f64>) -> DVector<f64> {
  let mut w = DVector::from_element(cov.nrows(), 1.0);
  let mut pending = vec![order];

  while let Some(cluster) = pending.pop() {
    if cluster.len() < 2 {
      continue;
    }
    let (left, right) = cluster.split_at(cluster.len() / 2);
    let var_left = inverse_variance_portfolio_variance(left, cov);
    let var_right = inverse_variance_portfolio_variance(right, cov);

    let total = var_left + var_right;
    let alpha = if total > 1e-30 { var_right / total } else { 0.5 };
    left.iter().for_each(|&i| w[i] *= alpha);
    right.iter().for_each(|&i| w[i] *= 1.0 - alpha);

    pending.push(left);
    pending.push(right);
  }

  w
}

/// `w' Σ w` for `w ∝ 1/σ²` over `members`; zero when every member is riskless.
fn inverse_variance_portfolio_variance(members: &[usize], cov: &DMatrix<f64>) -> f64 {
  let sub = cov.select_rows(members).select_columns(members);
  let inv_var = sub
    .diagonal()
    .map(|v| if v > VARIANCE_FLOOR { 1.0 / v } else { 0.0 });
  let total = inv_var.sum();
  if total <= VARIANCE_FLOOR {
    return 0.0;
  }

  let w = inv_var / total;
  w.dot(&(&sub * &w))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::strategies::fixtures::history_from_returns;
  use crate::strategies::fixtures::wiggle;

  #[test]
  fn single_linkage_pairs_close_assets() {
    let dist = DMatrix::from_row_slice(
      4,
      4,
      &[
        0.0, 0.9, 0.1, 0.8, //
        0.9, 0.0, 0.85, 0.2, //
        0.1, 0.85, 0.0, 0.9, //
        0.8, 0.2, 0.9, 0.0,
      ],
    );
    let tree = single_linkage(&dist).unwrap();
    let order = tree.leaves();
    let pos = |x: usize| order.iter().position(|&i| i == x).unwrap();

    assert_eq!(order.len(), 4);
    assert_eq!((pos(0) as i64 - pos(2) as i64).abs(), 1);
    assert_eq!((pos(1) as i64 - pos(3) as i64).abs(), 1);
    assert_abs_diff_eq!(tree.height(), 0.8, epsilon = 1e-12);
  }

  #[test]
  fn perfectly_correlated_assets_have_zero_distance() {
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.06, 0.06, 0.09]);
    let dist = correlation_distance(&cov);
    assert_abs_diff_eq!(dist[(0, 1)], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(dist[(0, 0)], 0.0, epsilon = 1e-12);
  }

  #[test]
  fn uncorrelated_equal_variance_assets_get_equal_weight() {
    let cov = DMatrix::from_diagonal_element(4, 4, 0.04);
    let w = bisect(&[0, 1, 2, 3], &cov);
    for x in w.iter() {
      assert_abs_diff_eq!(*x, 0.25, epsilon = 1e-12);
    }
  }

  #[test]
  fn hrp_underweights_volatile_asset() {
    let history = history_from_returns(
      &["A", "B", "C"],
      &[
        wiggle(100, 0.0, 0.01, 0),
        wiggle(100, 0.0, 0.01, 5),
        wiggle(100, 0.0, 0.05, 2),
      ],
    );
    let w = hrp_weight(&history, 252);
    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    assert!(w.get("C") < w.get("A"));
    assert!(w.get("C") < w.get("B"));
  }

  #[test]
  fn constant_prices_fall_back_to_equal_weight() {
    let history = history_from_returns(&["A", "B"], &[vec![0.0; 30], vec![0.0; 30]]);
    let w = hrp_weight(&history, 252);
    assert_eq!(w.get("A"), 0.5);
    assert_eq!(w.get("B"), 0.5);
  }
}
