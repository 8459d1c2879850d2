//! # Strategy Combiner
//!
//! $$
//! \mathbf w = \frac{\sum_k f_k \mathbf w^{(k)}}{\mathbf 1^\top \sum_k f_k \mathbf w^{(k)}}
//! $$
//!

use crate::error::PortfolioError;
use crate::error::Result;
use crate::types::WeightVector;

/// Sum below which the blend is considered degenerate.
const DEGENERATE_SUM: f64 = 1e-12;

/// Blend strategy outputs by `fractions` over the union of their symbols,
/// then renormalize to unit sum.
pub fn combine(outputs: &[WeightVector], fractions: &[f64]) -> Result<WeightVector> {
  if outputs.len() != fractions.len() {
    return Err(PortfolioError::InvalidConfig(format!(
      "{} strategy outputs but {} blend fractions",
      outputs.len(),
      fractions.len()
    )));
  }

  let mut blended = WeightVector::new();
  for (weights, &f) in outputs.iter().zip(fractions.iter()) {
    for (symbol, w) in weights.iter() {
      blended.set(symbol, blended.get(symbol) + f * w);
    }
  }

  let sum = blended.sum();
  if !sum.is_finite() || sum.abs() < DEGENERATE_SUM {
    return Err(PortfolioError::DegenerateAllocation { sum });
  }

  Ok(blended.iter().map(|(s, w)| (s.to_string(), w / sum)).collect())
}
