//! # Strategy Configuration
//!
//! $$
//! \sum_k f_k \le 1,\qquad 0 \le w_{\min} \le w_{\max} \le 1
//! $$
//!
//! Every block deserializes with defaults, so a partial TOML file only needs
//! the keys it overrides. Files are layered under `PORTFOLIO__*` environment
//! variables and validated before use.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::risk::VarMethod;
use crate::solver::NelderMeadMinimizer;
use crate::strategies::StrategyKind;

/// Fraction of the final blend contributed by each strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendFractions {
  pub equal_weight: f64,
  pub market_cap_weight: f64,
  pub momentum_weight: f64,
  pub risk_parity_weight: f64,
  pub min_variance_weight: f64,
  pub max_sharpe_weight: f64,
  pub kelly_weight: f64,
  pub mean_variance_weight: f64,
  pub max_diversification_weight: f64,
  pub hrp_weight: f64,
}

impl Default for BlendFractions {
  fn default() -> Self {
    Self {
      equal_weight: 0.0,
      market_cap_weight: 0.3,
      momentum_weight: 0.4,
      risk_parity_weight: 0.3,
      min_variance_weight: 0.0,
      max_sharpe_weight: 0.0,
      kelly_weight: 0.0,
      mean_variance_weight: 0.0,
      max_diversification_weight: 0.0,
      hrp_weight: 0.0,
    }
  }
}

impl BlendFractions {
  /// Blend where `kind` receives the whole allocation.
  pub fn only(kind: StrategyKind) -> Self {
    let mut blend = Self {
      market_cap_weight: 0.0,
      momentum_weight: 0.0,
      risk_parity_weight: 0.0,
      ..Self::default()
    };
    *blend.fraction_mut(kind) = 1.0;
    blend
  }

  pub fn fraction(&self, kind: StrategyKind) -> f64 {
    match kind {
      StrategyKind::EqualWeight => self.equal_weight,
      StrategyKind::MarketCap => self.market_cap_weight,
      StrategyKind::Momentum => self.momentum_weight,
      StrategyKind::RiskParity => self.risk_parity_weight,
      StrategyKind::MinVariance => self.min_variance_weight,
      StrategyKind::MaxSharpe => self.max_sharpe_weight,
      StrategyKind::Kelly => self.kelly_weight,
      StrategyKind::MeanVariance => self.mean_variance_weight,
      StrategyKind::MaxDiversification => self.max_diversification_weight,
      StrategyKind::Hrp => self.hrp_weight,
    }
  }

  fn fraction_mut(&mut self, kind: StrategyKind) -> &mut f64 {
    match kind {
      StrategyKind::EqualWeight => &mut self.equal_weight,
      StrategyKind::MarketCap => &mut self.market_cap_weight,
      StrategyKind::Momentum => &mut self.momentum_weight,
      StrategyKind::RiskParity => &mut self.risk_parity_weight,
      StrategyKind::MinVariance => &mut self.min_variance_weight,
      StrategyKind::MaxSharpe => &mut self.max_sharpe_weight,
      StrategyKind::Kelly => &mut self.kelly_weight,
      StrategyKind::MeanVariance => &mut self.mean_variance_weight,
      StrategyKind::MaxDiversification => &mut self.max_diversification_weight,
      StrategyKind::Hrp => &mut self.hrp_weight,
    }
  }

  /// Strategies with a non-zero fraction, in [`StrategyKind::ALL`] order.
  pub fn active(&self) -> Vec<(StrategyKind, f64)> {
    StrategyKind::ALL
      .iter()
      .map(|&kind| (kind, self.fraction(kind)))
      .filter(|&(_, f)| f > 0.0)
      .collect()
  }

  pub fn total(&self) -> f64 {
    StrategyKind::ALL.iter().map(|&k| self.fraction(k)).sum()
  }
}

/// Lookback windows, in periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookbackWindows {
  pub momentum: usize,
  pub volatility: usize,
  pub covariance: usize,
}

impl Default for LookbackWindows {
  fn default() -> Self {
    Self {
      momentum: 126,
      volatility: 63,
      covariance: 252,
    }
  }
}

/// Bounds applied to the blended weights.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintParams {
  pub min_weight: f64,
  pub max_weight: f64,
  /// `None` keeps every asset.
  pub max_positions: Option<usize>,
}

impl Default for ConstraintParams {
  fn default() -> Self {
    Self {
      min_weight: 0.0,
      max_weight: 1.0,
      max_positions: None,
    }
  }
}

/// Settings of the numerical minimizer used by the optimized strategies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
  pub max_iters: u64,
  pub sd_tolerance: f64,
  pub penalty: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 2000,
      sd_tolerance: 1e-10,
      penalty: 1e4,
    }
  }
}

impl SolverConfig {
  pub fn minimizer(&self) -> NelderMeadMinimizer {
    NelderMeadMinimizer::new(self.max_iters, self.sd_tolerance, self.penalty)
  }
}

/// Full configuration of a portfolio optimization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
  pub blend: BlendFractions,
  pub lookbacks: LookbackWindows,
  pub constraints: ConstraintParams,
  /// Annual risk-free rate.
  pub risk_free_rate: f64,
  pub periods_per_year: u32,
  /// Lookback return below which momentum assigns zero weight.
  pub momentum_threshold: f64,
  pub kelly_fraction: f64,
  /// `lambda` of the mean-variance utility.
  pub risk_aversion: f64,
  pub var_confidence: Vec<f64>,
  pub var_method: VarMethod,
  pub solver: SolverConfig,
  /// Minimum number of common price dates.
  pub min_history: usize,
}

impl Default for StrategyConfig {
  fn default() -> Self {
    Self {
      blend: BlendFractions::default(),
      lookbacks: LookbackWindows::default(),
      constraints: ConstraintParams::default(),
      risk_free_rate: 0.05,
      periods_per_year: 252,
      momentum_threshold: 0.0,
      kelly_fraction: 0.25,
      risk_aversion: 2.5,
      var_confidence: vec![0.95, 0.99],
      var_method: VarMethod::Historical,
      solver: SolverConfig::default(),
      min_history: 2,
    }
  }
}

fn invalid(msg: impl Into<String>) -> PortfolioError {
  PortfolioError::InvalidConfig(msg.into())
}

impl StrategyConfig {
  /// Load from a TOML/JSON/YAML file (format from the extension), apply
  /// `PORTFOLIO__<SECTION>__<KEY>` overrides, then validate.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let settings = ::config::Config::builder()
      .add_source(::config::File::from(path.as_ref()))
      .add_source(
        ::config::Environment::with_prefix("PORTFOLIO")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    let cfg = settings.try_deserialize::<StrategyConfig>()?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<()> {
    for &kind in StrategyKind::ALL.iter() {
      let f = self.blend.fraction(kind);
      if !f.is_finite() || f < 0.0 {
        return Err(invalid(format!(
          "blend fraction for {} must be non-negative, got {f}",
          kind.name()
        )));
      }
    }

    let total = self.blend.total();
    if total <= 0.0 {
      return Err(invalid("blend fractions are all zero"));
    }
    if total > 1.0 + 1e-9 {
      return Err(invalid(format!("blend fractions sum to {total}, above 1")));
    }

    let c = &self.constraints;
    if !(c.min_weight >= 0.0) {
      return Err(invalid(format!("min_weight must be >= 0, got {}", c.min_weight)));
    }
    if !(c.max_weight > 0.0 && c.max_weight <= 1.0) {
      return Err(invalid(format!("max_weight must be in (0, 1], got {}", c.max_weight)));
    }
    if c.min_weight > c.max_weight {
      return Err(invalid(format!(
        "min_weight {} exceeds max_weight {}",
        c.min_weight, c.max_weight
      )));
    }
    if c.max_positions == Some(0) {
      return Err(invalid("max_positions must be at least 1"));
    }

    let lb = &self.lookbacks;
    if lb.momentum == 0 || lb.volatility == 0 || lb.covariance == 0 {
      return Err(invalid("lookback windows must be positive"));
    }
    if self.periods_per_year == 0 {
      return Err(invalid("periods_per_year must be positive"));
    }
    if !self.risk_free_rate.is_finite() || !self.momentum_threshold.is_finite() {
      return Err(invalid("risk_free_rate and momentum_threshold must be finite"));
    }
    if let Some(c) = self
      .var_confidence
      .iter()
      .find(|c| !(**c > 0.0 && **c < 1.0))
    {
      return Err(invalid(format!("VaR confidence must be in (0, 1), got {c}")));
    }
    if !(self.kelly_fraction > 0.0) {
      return Err(invalid(format!(
        "kelly_fraction must be positive, got {}",
        self.kelly_fraction
      )));
    }
    if !(self.risk_aversion >= 0.0) {
      return Err(invalid("risk_aversion must be non-negative"));
    }
    if self.solver.max_iters == 0 {
      return Err(invalid("solver.max_iters must be positive"));
    }

    Ok(())
  }
}
