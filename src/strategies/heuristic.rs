//! # Heuristic Allocations
//!
//! $$
//! w_i^{\text{cap}} = \frac{c_i}{\sum_j c_j},\qquad
//! w_i^{\text{mom}} \propto \max(m_i, 0)\,\mathbb 1[m_i \ge \tau],\qquad
//! w_i^{\text{rp}} \propto \sigma_i^{-1}
//! $$
//!

use std::collections::BTreeMap;

use tracing::warn;

use super::StrategyKind;
use super::short_window_fallback;
use crate::stats::sample_std;
use crate::types::AlignedHistory;
use crate::types::WeightVector;

/// `1/N` for every symbol.
pub fn equal_weight(symbols: &[String]) -> WeightVector {
  WeightVector::equal(symbols)
}

/// Capitalization-proportional weights. Missing or non-positive caps count as zero;
/// equal weight when no cap is usable.
pub fn market_cap_weight(symbols: &[String], caps: Option<&BTreeMap<String, f64>>) -> WeightVector {
  let Some(caps) = caps else {
    warn!(strategy = "market_cap", "no market caps supplied, using equal weight");
    return WeightVector::equal(symbols);
  };

  let usable: Vec<f64> = symbols
    .iter()
    .map(|s| {
      caps
        .get(s)
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .unwrap_or(0.0)
    })
    .collect();

  let missing = usable.iter().filter(|&&c| c == 0.0).count();
  if missing > 0 {
    warn!(strategy = "market_cap", missing, "market cap missing for some assets");
  }

  let total: f64 = usable.iter().sum();
  if total <= 0.0 {
    return WeightVector::equal(symbols);
  }

  symbols
    .iter()
    .zip(usable.iter())
    .map(|(s, &c)| (s.clone(), c / total))
    .collect()
}

/// Cumulative return of each asset over the last `lookback` periods.
pub fn lookback_momentum(history: &AlignedHistory, lookback: usize) -> Vec<f64> {
  history
    .prices
    .iter()
    .map(|p| {
      let start = p.len().saturating_sub(lookback.saturating_add(1));
      match (p.get(start), p.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        _ => 0.0,
      }
    })
    .collect()
}

/// Momentum weights: assets whose lookback return is below `threshold` get zero,
/// the rest are proportional to their positive momentum.
///
/// When no asset clears the threshold the whole universe is equal-weighted;
/// when the clearing assets have no positive momentum they are equal-weighted.
pub fn momentum_weight(history: &AlignedHistory, lookback: usize, threshold: f64) -> WeightVector {
  let symbols = &history.symbols;
  if history.n_periods() < 2 {
    return short_window_fallback(symbols, StrategyKind::Momentum);
  }

  let momentum = lookback_momentum(history, lookback);
  let clears: Vec<bool> = momentum.iter().map(|&m| m >= threshold).collect();
  let n_clear = clears.iter().filter(|&&c| c).count();

  if n_clear == 0 {
    return WeightVector::equal(symbols);
  }

  let positive: Vec<f64> = momentum
    .iter()
    .zip(clears.iter())
    .map(|(&m, &c)| if c { m.max(0.0) } else { 0.0 })
    .collect();
  let total: f64 = positive.iter().sum();

  if total <= 1e-15 {
    let w = 1.0 / n_clear as f64;
    return symbols
      .iter()
      .zip(clears.iter())
      .map(|(s, &c)| (s.clone(), if c { w } else { 0.0 }))
      .collect();
  }

  symbols
    .iter()
    .zip(positive.iter())
    .map(|(s, &m)| (s.clone(), m / total))
    .collect()
}

/// Inverse-volatility heuristic over the last `lookback` returns.
///
/// Riskless assets have unbounded inverse volatility, so when any are present
/// they split the allocation equally and the volatile ones get nothing.
pub fn inverse_volatility_weight(history: &AlignedHistory, lookback: usize) -> WeightVector {
  let symbols = &history.symbols;
  let returns = history.window_returns(lookback);
  if returns.is_empty() || returns.iter().any(|r| r.len() < 2) {
    return short_window_fallback(symbols, StrategyKind::RiskParity);
  }

  let vols: Vec<f64> = returns.iter().map(|r| sample_std(r)).collect();
  let riskless: Vec<bool> = vols.iter().map(|&sigma| sigma.is_nan() || sigma <= 1e-15).collect();
  let n_riskless = riskless.iter().filter(|&&z| z).count();

  if n_riskless > 0 {
    if n_riskless < symbols.len() {
      warn!(
        strategy = "risk_parity",
        riskless = n_riskless,
        "zero-volatility assets present, splitting weight among them"
      );
    }
    let share = 1.0 / n_riskless as f64;
    return symbols
      .iter()
      .zip(riskless.iter())
      .map(|(s, &z)| (s.clone(), if z { share } else { 0.0 }))
      .collect();
  }

  let inv_vols: Vec<f64> = vols.iter().map(|sigma| 1.0 / sigma).collect();
  let total: f64 = inv_vols.iter().sum();
  if !total.is_finite() || total <= 1e-15 {
    return WeightVector::equal(symbols);
  }

  symbols
    .iter()
    .zip(inv_vols.iter())
    .map(|(s, &iv)| (s.clone(), iv / total))
    .collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::strategies::fixtures::history_from_returns;
  use crate::strategies::fixtures::wiggle;

  fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn equal_weight_is_exact() {
    for n in 1..=12 {
      let syms: Vec<String> = (0..n).map(|i| format!("S{i}")).collect();
      let w = equal_weight(&syms);
      for s in &syms {
        assert_eq!(w.get(s), 1.0 / n as f64);
      }
    }
  }

  #[test]
  fn market_cap_weights_are_proportional() {
    let syms = symbols(&["A", "B", "C"]);
    let caps: BTreeMap<String, f64> = [("A", 300.0), ("B", 100.0), ("C", 600.0)]
      .into_iter()
      .map(|(s, c)| (s.to_string(), c))
      .collect();
    let w = market_cap_weight(&syms, Some(&caps));
    assert_abs_diff_eq!(w.get("A"), 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(w.get("B"), 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(w.get("C"), 0.6, epsilon = 1e-12);
  }

  #[test]
  fn zero_total_cap_falls_back_to_equal() {
    let syms = symbols(&["A", "B"]);
    let caps: BTreeMap<String, f64> = [("A".to_string(), 0.0), ("B".to_string(), 0.0)]
      .into_iter()
      .collect();
    let w = market_cap_weight(&syms, Some(&caps));
    assert_eq!(w.get("A"), 0.5);
    assert_eq!(w.get("B"), 0.5);
    assert_eq!(market_cap_weight(&syms, None).get("B"), 0.5);
  }

  #[test]
  fn momentum_zeroes_assets_below_threshold() {
    // A: +10%, B: +30%, C: -5%, D: +1%
    let history = history_from_returns(
      &["A", "B", "C", "D"],
      &[vec![0.10], vec![0.30], vec![-0.05], vec![0.01]],
    );
    let w = momentum_weight(&history, 126, 0.05);

    assert_eq!(w.get("C"), 0.0);
    assert_eq!(w.get("D"), 0.0);
    assert_abs_diff_eq!(w.get("A"), 0.25, epsilon = 1e-9);
    assert_abs_diff_eq!(w.get("B"), 0.75, epsilon = 1e-9);
  }

  #[test]
  fn momentum_falls_back_to_equal_when_nothing_clears() {
    let history = history_from_returns(
      &["A", "B", "C"],
      &[vec![-0.02, -0.01], vec![-0.05, 0.0], vec![0.01, -0.03]],
    );
    let w = momentum_weight(&history, 126, 0.0);
    for s in ["A", "B", "C"] {
      assert_eq!(w.get(s), 1.0 / 3.0);
    }
  }

  #[test]
  fn momentum_respects_lookback_window() {
    // Large early rally for A is outside a 2-period window.
    let history = history_from_returns(
      &["A", "B"],
      &[vec![0.50, -0.01, -0.01], vec![0.0, 0.02, 0.02]],
    );
    let w = momentum_weight(&history, 2, 0.0);
    assert_eq!(w.get("A"), 0.0);
    assert_eq!(w.get("B"), 1.0);
  }

  #[test]
  fn inverse_volatility_prefers_calm_assets() {
    let history = history_from_returns(
      &["CALM", "WILD"],
      &[wiggle(60, 0.0, 0.01, 0), wiggle(60, 0.0, 0.03, 0)],
    );
    let w = inverse_volatility_weight(&history, 63);
    assert_abs_diff_eq!(w.get("CALM"), 0.75, epsilon = 1e-3);
    assert!(w.get("CALM") > w.get("WILD"));
  }

  #[test]
  fn constant_series_fall_back_to_equal() {
    let history = history_from_returns(&["A", "B"], &[vec![0.0; 10], vec![0.0; 10]]);
    let w = inverse_volatility_weight(&history, 63);
    assert_eq!(w.get("A"), 0.5);
    assert_eq!(w.get("B"), 0.5);
  }

  #[test]
  #[traced_test]
  fn riskless_asset_takes_the_allocation() {
    let history = history_from_returns(
      &["CASH", "RISKY"],
      &[vec![0.0; 40], wiggle(40, 0.0, 0.02, 0)],
    );
    let w = inverse_volatility_weight(&history, 63);
    assert_eq!(w.get("CASH"), 1.0);
    assert_eq!(w.get("RISKY"), 0.0);
    assert!(logs_contain("zero-volatility assets present"));
  }
}
