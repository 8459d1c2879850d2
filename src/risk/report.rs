//! # Risk Metrics Report
//!
//! $$
//! \mathcal R = (R, R_{ann}, \sigma_{ann}, S, S_-, C, \text{MDD}, \mathrm{VaR}, \mathrm{CVaR}, \beta, \rho, \mathrm{TE}, \mathrm{IR})
//! $$
//!

use chrono::NaiveDate;
use prettytable::Table;
use prettytable::row;
use serde::Serialize;

use super::RiskCalculator;
use super::drawdown::Drawdown;
use super::drawdown::max_drawdown;
use super::relative::align_dated;
use crate::error::DataQualityError;
use crate::returns::annualized_return;
use crate::returns::total_return;
use crate::returns::value_curve;

/// VaR/CVaR pair at one confidence level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TailRisk {
  pub confidence: f64,
  pub var: f64,
  pub cvar: f64,
}

/// Metrics relative to a benchmark over the dates both series share.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BenchmarkMetrics {
  pub observations: usize,
  pub beta: f64,
  pub correlation: f64,
  pub tracking_error: f64,
  pub information_ratio: f64,
}

/// Immutable snapshot of the risk profile of one return series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskMetricsReport {
  pub observations: usize,
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub total_return: f64,
  pub annualized_return: f64,
  pub annualized_volatility: f64,
  pub sharpe: f64,
  pub sortino: f64,
  pub calmar: f64,
  pub max_drawdown: Drawdown,
  pub tail: Vec<TailRisk>,
  pub benchmark: Option<BenchmarkMetrics>,
}

impl RiskCalculator {
  /// Build a report for `returns`, where `dates[0]` is the starting valuation
  /// date and `dates[t + 1]` stamps `returns[t]`.
  pub fn report(
    &self,
    dates: &[NaiveDate],
    returns: &[f64],
    benchmark: Option<&[(NaiveDate, f64)]>,
    confidence_levels: &[f64],
  ) -> Result<RiskMetricsReport, DataQualityError> {
    if returns.is_empty() || dates.len() != returns.len() + 1 {
      return Err(DataQualityError::InsufficientData {
        required: returns.len().max(1) + 1,
        actual: dates.len(),
      });
    }

    let curve: Vec<(NaiveDate, f64)> = dates
      .iter()
      .copied()
      .zip(value_curve(returns))
      .collect();
    let drawdown = max_drawdown(&curve)?;

    let start = dates[0];
    let end = dates[dates.len() - 1];
    let total = total_return(returns);
    let days = (end - start).num_days() as f64;

    let tail = confidence_levels
      .iter()
      .map(|&confidence| TailRisk {
        confidence,
        var: self.value_at_risk(returns, confidence),
        cvar: self.conditional_value_at_risk(returns, confidence),
      })
      .collect();

    let benchmark = benchmark.map(|bench| {
      let dated: Vec<(NaiveDate, f64)> = dates[1..].iter().copied().zip(returns.iter().copied()).collect();
      let (p, b) = align_dated(&dated, bench);
      BenchmarkMetrics {
        observations: p.len(),
        beta: self.beta(&p, &b),
        correlation: self.correlation(&p, &b),
        tracking_error: self.tracking_error(&p, &b),
        information_ratio: self.information_ratio(&p, &b),
      }
    });

    Ok(RiskMetricsReport {
      observations: returns.len(),
      start,
      end,
      total_return: total,
      annualized_return: annualized_return(total, days),
      annualized_volatility: self.annualized_volatility(returns),
      sharpe: self.sharpe(returns),
      sortino: self.sortino(returns),
      calmar: self.calmar(returns),
      max_drawdown: drawdown,
      tail,
      benchmark,
    })
  }
}

impl RiskMetricsReport {
  /// Render as a two-column table.
  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Metric", "Value"]);
    table.add_row(row!["Period", format!("{} .. {}", self.start, self.end)]);
    table.add_row(row!["Observations", self.observations]);
    table.add_row(row!["Total return", format!("{:.4}", self.total_return)]);
    table.add_row(row!["Annualized return", format!("{:.4}", self.annualized_return)]);
    table.add_row(row!["Annualized volatility", format!("{:.4}", self.annualized_volatility)]);
    table.add_row(row!["Sharpe", format!("{:.4}", self.sharpe)]);
    table.add_row(row!["Sortino", format!("{:.4}", self.sortino)]);
    table.add_row(row!["Calmar", format!("{:.4}", self.calmar)]);
    table.add_row(row![
      "Max drawdown",
      format!(
        "{:.4} ({} -> {})",
        self.max_drawdown.magnitude, self.max_drawdown.peak, self.max_drawdown.trough
      )
    ]);
    for t in &self.tail {
      let pct = t.confidence * 100.0;
      table.add_row(row![format!("VaR {pct:.0}%"), format!("{:.4}", t.var)]);
      table.add_row(row![format!("CVaR {pct:.0}%"), format!("{:.4}", t.cvar)]);
    }
    if let Some(b) = &self.benchmark {
      table.add_row(row!["Beta", format!("{:.4}", b.beta)]);
      table.add_row(row!["Correlation", format!("{:.4}", b.correlation)]);
      table.add_row(row!["Tracking error", format!("{:.4}", b.tracking_error)]);
      table.add_row(row!["Information ratio", format!("{:.4}", b.information_ratio)]);
    }
    table
  }
}
