//! # Drawdown
//!
//! $$
//! \text{MDD} = \min_t \frac{V_t - \max_{s\le t} V_s}{\max_{s\le t} V_s}
//! $$
//!

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::error::DataQualityError;
use crate::returns::value_curve;

/// Largest peak-to-trough decline of a value series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
  /// Decline as a positive fraction of the peak (`0.25` = 25% below peak).
  pub magnitude: f64,
  /// Date of the running maximum preceding the trough.
  pub peak: NaiveDate,
  /// Date of the lowest point relative to that peak.
  pub trough: NaiveDate,
  /// First date the series regained the peak value after the trough.
  pub recovery: Option<NaiveDate>,
}

/// `(magnitude, peak_index, trough_index)` of the deepest drawdown.
fn deepest_drawdown(values: &[f64]) -> (f64, usize, usize) {
  let mut running_max = f64::NEG_INFINITY;
  let mut running_max_idx = 0;
  let mut worst = 0.0;
  let mut peak_idx = 0;
  let mut trough_idx = 0;

  for (i, &v) in values.iter().enumerate() {
    if v > running_max {
      running_max = v;
      running_max_idx = i;
    }
    if running_max > 0.0 {
      let dd = (v - running_max) / running_max;
      if dd < worst {
        worst = dd;
        peak_idx = running_max_idx;
        trough_idx = i;
      }
    }
  }

  let magnitude = if worst < 0.0 { -worst } else { 0.0 };
  (magnitude, peak_idx, trough_idx)
}

/// Maximum drawdown of a dated value series (needs at least two points).
pub fn max_drawdown(values: &[(NaiveDate, f64)]) -> Result<Drawdown, DataQualityError> {
  if values.len() < 2 {
    return Err(DataQualityError::InsufficientData {
      required: 2,
      actual: values.len(),
    });
  }

  let raw: Vec<f64> = values.iter().map(|&(_, v)| v).collect();
  let (magnitude, peak_idx, trough_idx) = deepest_drawdown(&raw);
  let peak_value = raw[peak_idx];

  let recovery = if magnitude > 0.0 {
    values[trough_idx..]
      .iter()
      .find(|&&(_, v)| v >= peak_value)
      .map(|&(d, _)| d)
  } else {
    None
  };

  Ok(Drawdown {
    magnitude,
    peak: values[peak_idx].0,
    trough: values[trough_idx].0,
    recovery,
  })
}

/// Maximum drawdown magnitude of the value curve compounded from `returns`.
pub fn max_drawdown_from_returns(returns: &[f64]) -> f64 {
  deepest_drawdown(&value_curve(returns)).0
}
