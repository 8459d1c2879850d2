//! # Portfolio Types
//!
//! $$
//! \mathbf{w} \in \mathbb{R}^N,\qquad \sum_i w_i = 1
//! $$
//!
//! Price histories supplied by the caller, their date-aligned view and the
//! symbol-keyed weight vector produced by every strategy.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::Days;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::error::DataQualityError;
use crate::returns::simple_returns;

/// Ordered `(date, price)` observations of a single asset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
  points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
  /// Wrap raw observations. Ordering and positivity are checked by [`PriceSeries::validate`].
  pub fn new(points: Vec<(NaiveDate, f64)>) -> Self {
    Self { points }
  }

  /// Build a series with one observation per calendar day starting at `start`.
  pub fn from_prices(start: NaiveDate, prices: &[f64]) -> Self {
    let points = prices
      .iter()
      .enumerate()
      .map(|(i, &p)| (start + Days::new(i as u64), p))
      .collect();
    Self { points }
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn points(&self) -> &[(NaiveDate, f64)] {
    &self.points
  }

  pub fn prices(&self) -> Vec<f64> {
    self.points.iter().map(|&(_, p)| p).collect()
  }

  pub fn dates(&self) -> Vec<NaiveDate> {
    self.points.iter().map(|&(d, _)| d).collect()
  }

  pub fn first_date(&self) -> Option<NaiveDate> {
    self.points.first().map(|&(d, _)| d)
  }

  pub fn last_date(&self) -> Option<NaiveDate> {
    self.points.last().map(|&(d, _)| d)
  }

  /// Check the series is non-empty, strictly increasing in time and strictly positive.
  pub fn validate(&self, symbol: &str) -> Result<(), DataQualityError> {
    if self.points.is_empty() {
      return Err(DataQualityError::EmptySeries {
        symbol: symbol.to_string(),
      });
    }

    for (index, &(_, price)) in self.points.iter().enumerate() {
      if !price.is_finite() {
        return Err(DataQualityError::NonFinitePrice { index });
      }
      if price <= 0.0 {
        return Err(DataQualityError::NonPositivePrice { index, price });
      }
    }

    if let Some(index) = self
      .points
      .windows(2)
      .position(|w| w[1].0 <= w[0].0)
    {
      return Err(DataQualityError::UnorderedTimestamps {
        symbol: symbol.to_string(),
        index: index + 1,
      });
    }

    Ok(())
  }
}

/// Everything the engine consumes for one portfolio.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PriceHistory {
  /// Price series per asset symbol.
  pub assets: BTreeMap<String, PriceSeries>,
  /// Latest market capitalization per symbol, if known.
  pub market_caps: Option<BTreeMap<String, f64>>,
  /// Benchmark price series for comparative metrics.
  pub benchmark: Option<PriceSeries>,
}

impl PriceHistory {
  pub fn new(assets: BTreeMap<String, PriceSeries>) -> Self {
    Self {
      assets,
      market_caps: None,
      benchmark: None,
    }
  }

  pub fn with_market_caps(mut self, caps: BTreeMap<String, f64>) -> Self {
    self.market_caps = Some(caps);
    self
  }

  pub fn with_benchmark(mut self, benchmark: PriceSeries) -> Self {
    self.benchmark = Some(benchmark);
    self
  }

  /// Validate every asset series and the benchmark.
  pub fn validate(&self) -> Result<(), DataQualityError> {
    if self.assets.is_empty() {
      return Err(DataQualityError::EmptyUniverse);
    }
    for (symbol, series) in &self.assets {
      series.validate(symbol)?;
    }
    if let Some(benchmark) = &self.benchmark {
      benchmark.validate("benchmark")?;
    }
    Ok(())
  }

  /// Restrict every asset to the dates all of them share.
  ///
  /// Fails when the common history is shorter than `min_history` observations.
  pub fn align(&self, min_history: usize) -> Result<AlignedHistory, DataQualityError> {
    self.validate()?;

    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for series in self.assets.values() {
      let dates: BTreeSet<NaiveDate> = series.dates().into_iter().collect();
      common = Some(match common {
        None => dates,
        Some(acc) => acc.intersection(&dates).copied().collect(),
      });
    }

    let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();
    if dates.is_empty() {
      return Err(DataQualityError::NoCommonHistory);
    }

    let required = min_history.max(2);
    if dates.len() < required {
      return Err(DataQualityError::InsufficientData {
        required,
        actual: dates.len(),
      });
    }

    let mut symbols = Vec::with_capacity(self.assets.len());
    let mut prices = Vec::with_capacity(self.assets.len());
    for (symbol, series) in &self.assets {
      let by_date: BTreeMap<NaiveDate, f64> = series.points().iter().copied().collect();
      let aligned: Vec<f64> = dates
        .iter()
        .filter_map(|d| by_date.get(d).copied())
        .collect();
      symbols.push(symbol.clone());
      prices.push(aligned);
    }

    Ok(AlignedHistory {
      symbols,
      dates,
      prices,
    })
  }
}

/// Date-aligned prices of the whole universe; `prices[i]` belongs to `symbols[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedHistory {
  pub symbols: Vec<String>,
  pub dates: Vec<NaiveDate>,
  pub prices: Vec<Vec<f64>>,
}

impl AlignedHistory {
  pub fn n_assets(&self) -> usize {
    self.symbols.len()
  }

  pub fn n_periods(&self) -> usize {
    self.dates.len()
  }

  /// Simple returns per asset over the last `lookback` periods (all periods if shorter).
  pub fn window_returns(&self, lookback: usize) -> Vec<Vec<f64>> {
    self
      .prices
      .iter()
      .map(|p| {
        let start = p.len().saturating_sub(lookback.saturating_add(1));
        simple_returns(&p[start..]).unwrap_or_default()
      })
      .collect()
  }

  /// Simple returns per asset over the full aligned history.
  pub fn full_returns(&self) -> Vec<Vec<f64>> {
    self.window_returns(usize::MAX)
  }

  /// Dates stamping each return of [`AlignedHistory::full_returns`].
  pub fn return_dates(&self) -> &[NaiveDate] {
    self.dates.get(1..).unwrap_or(&[])
  }
}

/// Mapping from asset symbol to weight.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<String, f64>);

impl WeightVector {
  pub fn new() -> Self {
    Self::default()
  }

  /// `1/N` for each symbol.
  pub fn equal<S: AsRef<str>>(symbols: &[S]) -> Self {
    if symbols.is_empty() {
      return Self::default();
    }
    let w = 1.0 / symbols.len() as f64;
    symbols
      .iter()
      .map(|s| (s.as_ref().to_string(), w))
      .collect()
  }

  /// Zip symbols with a positional weight slice.
  pub fn from_slices<S: AsRef<str>>(symbols: &[S], weights: &[f64]) -> Self {
    symbols
      .iter()
      .zip(weights.iter())
      .map(|(s, &w)| (s.as_ref().to_string(), w))
      .collect()
  }

  /// Weight of `symbol`, `0.0` when absent.
  pub fn get(&self, symbol: &str) -> f64 {
    self.0.get(symbol).copied().unwrap_or(0.0)
  }

  pub fn set(&mut self, symbol: impl Into<String>, weight: f64) {
    self.0.insert(symbol.into(), weight);
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn sum(&self) -> f64 {
    self.0.values().sum()
  }

  pub fn max_weight(&self) -> f64 {
    self.0.values().copied().fold(f64::NEG_INFINITY, f64::max)
  }

  pub fn min_weight(&self) -> f64 {
    self.0.values().copied().fold(f64::INFINITY, f64::min)
  }

  pub fn non_zero_count(&self) -> usize {
    self.0.values().filter(|w| w.abs() > 0.0).count()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(s, &w)| (s.as_str(), w))
  }

  pub fn symbols(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  /// Weights in the order of `symbols`, missing entries as `0.0`.
  pub fn to_vec<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<f64> {
    symbols.iter().map(|s| self.get(s.as_ref())).collect()
  }

  /// Rescale to unit sum; `None` when the sum is (numerically) zero.
  pub fn normalized(&self) -> Option<WeightVector> {
    let total = self.sum();
    if !total.is_finite() || total.abs() < 1e-15 {
      return None;
    }
    Some(self.0.iter().map(|(s, &w)| (s.clone(), w / total)).collect())
  }
}

impl FromIterator<(String, f64)> for WeightVector {
  fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a WeightVector {
  type Item = (&'a String, &'a f64);
  type IntoIter = std::collections::btree_map::Iter<'a, String, f64>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}
