//! # Weight Strategies
//!
//! $$
//! \mathbf w^{(k)} = s_k(\text{history}, \text{lookback}, \theta_k)
//! $$
//!
//! Raw, unconstrained allocations. A strategy never fails: short windows,
//! zero-variance series, singular covariance matrices and non-converged
//! solves all degrade to a simpler heuristic (usually equal weight).

pub mod closed_form;
pub mod heuristic;
pub mod hrp;
pub mod optimized;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

pub use closed_form::kelly_weight;
pub use closed_form::min_variance_weight;
pub use heuristic::equal_weight;
pub use heuristic::inverse_volatility_weight;
pub use heuristic::market_cap_weight;
pub use heuristic::momentum_weight;
pub use hrp::hrp_weight;
pub use optimized::max_diversification_weight;
pub use optimized::max_sharpe_weight;
pub use optimized::mean_variance_weight;

use crate::config::StrategyConfig;
use crate::solver::Minimizer;
use crate::stats::sample_covariance_matrix;
use crate::stats::sample_mean;
use crate::types::AlignedHistory;
use crate::types::WeightVector;

/// Allocation rule feeding the blend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
  /// `1/N` per asset.
  EqualWeight,
  /// Proportional to market capitalization.
  MarketCap,
  /// Proportional to positive lookback return above a threshold.
  Momentum,
  /// Proportional to inverse volatility.
  RiskParity,
  /// Closed-form global minimum variance.
  MinVariance,
  /// Long-only tangency portfolio.
  MaxSharpe,
  /// Fractional Kelly growth-optimal weights.
  Kelly,
  /// Long-only mean-variance utility maximizer.
  MeanVariance,
  /// Long-only diversification-ratio maximizer.
  MaxDiversification,
  /// Hierarchical Risk Parity (Lopez de Prado).
  Hrp,
}

impl StrategyKind {
  pub const ALL: [StrategyKind; 10] = [
    StrategyKind::EqualWeight,
    StrategyKind::MarketCap,
    StrategyKind::Momentum,
    StrategyKind::RiskParity,
    StrategyKind::MinVariance,
    StrategyKind::MaxSharpe,
    StrategyKind::Kelly,
    StrategyKind::MeanVariance,
    StrategyKind::MaxDiversification,
    StrategyKind::Hrp,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Self::EqualWeight => "equal_weight",
      Self::MarketCap => "market_cap",
      Self::Momentum => "momentum",
      Self::RiskParity => "risk_parity",
      Self::MinVariance => "min_variance",
      Self::MaxSharpe => "max_sharpe",
      Self::Kelly => "kelly",
      Self::MeanVariance => "mean_variance",
      Self::MaxDiversification => "max_diversification",
      Self::Hrp => "hrp",
    }
  }

  /// Parse a string into a [`StrategyKind`].
  pub fn from_str(s: &str) -> Option<Self> {
    match s.to_lowercase().replace('-', "_").as_str() {
      "equal" | "equal_weight" => Some(Self::EqualWeight),
      "market_cap" | "cap" => Some(Self::MarketCap),
      "momentum" => Some(Self::Momentum),
      "risk_parity" | "inverse_vol" | "inv_vol" => Some(Self::RiskParity),
      "min_variance" | "minvar" => Some(Self::MinVariance),
      "max_sharpe" | "tangency" => Some(Self::MaxSharpe),
      "kelly" => Some(Self::Kelly),
      "mean_variance" | "markowitz" => Some(Self::MeanVariance),
      "max_diversification" => Some(Self::MaxDiversification),
      "hrp" => Some(Self::Hrp),
      _ => None,
    }
  }
}

/// Inputs shared by every strategy of one optimization.
pub struct StrategyContext<'a> {
  pub history: &'a AlignedHistory,
  pub market_caps: Option<&'a BTreeMap<String, f64>>,
  pub config: &'a StrategyConfig,
  pub minimizer: &'a dyn Minimizer,
}

/// Dispatch to the selected strategy with the configured parameters.
pub fn compute_weights(kind: StrategyKind, ctx: &StrategyContext<'_>) -> WeightVector {
  let cfg = ctx.config;
  let history = ctx.history;
  let ppy = f64::from(cfg.periods_per_year);

  let weights = match kind {
    StrategyKind::EqualWeight => equal_weight(&history.symbols),
    StrategyKind::MarketCap => market_cap_weight(&history.symbols, ctx.market_caps),
    StrategyKind::Momentum => {
      momentum_weight(history, cfg.lookbacks.momentum, cfg.momentum_threshold)
    }
    StrategyKind::RiskParity => inverse_volatility_weight(history, cfg.lookbacks.volatility),
    StrategyKind::MinVariance => min_variance_weight(history, cfg.lookbacks.covariance),
    StrategyKind::MaxSharpe => max_sharpe_weight(
      history,
      cfg.lookbacks.covariance,
      cfg.risk_free_rate,
      ppy,
      ctx.minimizer,
    ),
    StrategyKind::Kelly => kelly_weight(history, cfg.lookbacks.covariance, cfg.kelly_fraction),
    StrategyKind::MeanVariance => mean_variance_weight(
      history,
      cfg.lookbacks.covariance,
      cfg.risk_aversion,
      ppy,
      ctx.minimizer,
    ),
    StrategyKind::MaxDiversification => {
      max_diversification_weight(history, cfg.lookbacks.covariance, ctx.minimizer)
    }
    StrategyKind::Hrp => hrp_weight(history, cfg.lookbacks.covariance),
  };

  debug!(strategy = kind.name(), ?weights, "strategy weights");
  weights
}

/// Per-period mean returns and sample covariance over a lookback window.
pub(crate) struct WindowMoments {
  pub mean: Vec<f64>,
  pub cov: Vec<Vec<f64>>,
}

/// `None` when the window holds fewer than two returns per asset.
pub(crate) fn window_moments(history: &AlignedHistory, lookback: usize) -> Option<WindowMoments> {
  let returns = history.window_returns(lookback);
  if returns.is_empty() || returns.iter().any(|r| r.len() < 2) {
    return None;
  }

  Some(WindowMoments {
    mean: returns.iter().map(|r| sample_mean(r)).collect(),
    cov: sample_covariance_matrix(&returns),
  })
}

/// Clip negatives and rescale; `None` when nothing positive remains.
pub(crate) fn long_only(symbols: &[String], raw: &[f64]) -> Option<WeightVector> {
  let clipped: Vec<f64> = raw
    .iter()
    .map(|&w| if w.is_finite() { w.max(0.0) } else { 0.0 })
    .collect();
  WeightVector::from_slices(symbols, &clipped).normalized()
}

pub(crate) fn equal_fallback(symbols: &[String], kind: StrategyKind, reason: &str) -> WeightVector {
  warn!(strategy = kind.name(), reason, "falling back to equal weight");
  WeightVector::equal(symbols)
}

pub(crate) fn short_window_fallback(symbols: &[String], kind: StrategyKind) -> WeightVector {
  debug!(strategy = kind.name(), "too few observations, using equal weight");
  WeightVector::equal(symbols)
}

#[cfg(test)]
pub(crate) mod fixtures {
  use chrono::NaiveDate;

  use crate::types::AlignedHistory;

  /// Aligned history built from per-asset return paths starting at 100.
  pub fn history_from_returns(symbols: &[&str], returns: &[Vec<f64>]) -> AlignedHistory {
    let n_periods = returns.first().map(|r| r.len() + 1).unwrap_or(0);
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let prices = returns
      .iter()
      .map(|path| {
        let mut p = vec![100.0];
        for r in path {
          let last = p[p.len() - 1];
          p.push(last * (1.0 + r));
        }
        p
      })
      .collect();

    AlignedHistory {
      symbols: symbols.iter().map(|s| s.to_string()).collect(),
      dates: (0..n_periods)
        .map(|i| start + chrono::Days::new(i as u64))
        .collect(),
      prices,
    }
  }

  /// Deterministic wiggle so every asset has non-zero variance.
  pub fn wiggle(n: usize, drift: f64, scale: f64, phase: usize) -> Vec<f64> {
    (0..n)
      .map(|t| drift + scale * (((t + phase) * 7 % 11) as f64 - 5.0) / 5.0)
      .collect()
  }
}
