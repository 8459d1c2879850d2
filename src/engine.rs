//! # Portfolio Engine
//!
//! $$
//! \mathbf w^\* = \mathcal C\Big(\sum_k f_k\, s_k(\text{history})\Big)
//! $$
//!
//! Orchestrates alignment, the configured strategy blend, constraint solving
//! and the risk report of the resulting allocation. The engine holds only its
//! validated configuration, so a single instance can serve many threads.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::combiner::combine;
use crate::config::StrategyConfig;
use crate::constraints::ConstrainedWeights;
use crate::constraints::ConstraintSolver;
use crate::error::Result;
use crate::returns::dated_returns;
use crate::returns::portfolio_returns;
use crate::risk::RiskCalculator;
use crate::risk::RiskMetricsReport;
use crate::strategies::StrategyContext;
use crate::strategies::StrategyKind;
use crate::strategies::compute_weights;
use crate::types::PriceHistory;
use crate::types::WeightVector;

/// How the constraint solver treated the blended weights.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstraintReport {
  pub iterations: usize,
  pub converged: bool,
  pub relaxed_min_weight: Option<f64>,
  pub dropped: Vec<String>,
  pub residual_violation: f64,
}

impl From<&ConstrainedWeights> for ConstraintReport {
  fn from(c: &ConstrainedWeights) -> Self {
    Self {
      iterations: c.iterations,
      converged: c.converged,
      relaxed_min_weight: c.relaxed_min_weight,
      dropped: c.dropped.clone(),
      residual_violation: c.residual_violation,
    }
  }
}

/// Result of [`PortfolioEngine::optimize`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Allocation {
  /// Final weights, summing to one.
  pub weights: WeightVector,
  /// Risk profile of the allocation over the aligned history.
  pub report: RiskMetricsReport,
  pub constraint_report: ConstraintReport,
  /// Raw output of every strategy that took part in the blend.
  pub strategy_weights: BTreeMap<StrategyKind, WeightVector>,
}

/// Single entry point for portfolio optimization.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: StrategyConfig,
}

impl PortfolioEngine {
  /// Construct an engine, rejecting invalid configuration.
  pub fn new(config: StrategyConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &StrategyConfig {
    &self.config
  }

  pub fn risk_calculator(&self) -> RiskCalculator {
    RiskCalculator::new(
      self.config.risk_free_rate,
      f64::from(self.config.periods_per_year),
      self.config.var_method,
    )
  }

  /// Blend the configured strategies over `history`, constrain the result and
  /// report its historical risk.
  pub fn optimize(&self, history: &PriceHistory) -> Result<Allocation> {
    let cfg = &self.config;
    let aligned = history.align(cfg.min_history)?;
    let benchmark = history.benchmark.as_ref().map(dated_returns).transpose()?;

    info!(
      assets = aligned.n_assets(),
      observations = aligned.n_periods(),
      benchmark = benchmark.is_some(),
      "optimizing portfolio"
    );

    let minimizer = cfg.solver.minimizer();
    let ctx = StrategyContext {
      history: &aligned,
      market_caps: history.market_caps.as_ref(),
      config: cfg,
      minimizer: &minimizer,
    };

    let active = cfg.blend.active();
    let outputs: Vec<WeightVector> = active
      .iter()
      .map(|&(kind, _)| compute_weights(kind, &ctx))
      .collect();
    let fractions: Vec<f64> = active.iter().map(|&(_, f)| f).collect();

    let blended = combine(&outputs, &fractions)?;
    let constrained = ConstraintSolver::from(cfg.constraints).solve(&blended);

    let weights_vec = constrained.weights.to_vec(&aligned.symbols);
    let returns = portfolio_returns(&weights_vec, &aligned.full_returns());
    let report = self.risk_calculator().report(
      &aligned.dates,
      &returns,
      benchmark.as_deref(),
      &cfg.var_confidence,
    )?;

    info!(
      positions = constrained.weights.non_zero_count(),
      sharpe = report.sharpe,
      max_drawdown = report.max_drawdown.magnitude,
      "portfolio optimized"
    );

    Ok(Allocation {
      constraint_report: ConstraintReport::from(&constrained),
      weights: constrained.weights,
      report,
      strategy_weights: active
        .iter()
        .map(|&(kind, _)| kind)
        .zip(outputs)
        .collect(),
    })
  }

  /// Optimize independent portfolios in parallel, one per worker.
  pub fn optimize_many(&self, histories: &[PriceHistory]) -> Vec<Result<Allocation>> {
    histories.par_iter().map(|h| self.optimize(h)).collect()
  }
}
