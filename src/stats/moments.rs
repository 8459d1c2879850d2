//! # Sample Moments
//!
//! $$
//! \bar x = \frac1n\sum_i x_i,\qquad s^2 = \frac{1}{n-1}\sum_i (x_i-\bar x)^2
//! $$
//!

pub fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

/// Unbiased variance around a precomputed `mean`; `0.0` below two points.
pub fn sample_variance(xs: &[f64], mean: f64) -> f64 {
  if xs.len() < 2 {
    return 0.0;
  }

  let mut acc = 0.0;
  for &x in xs {
    let d = x - mean;
    acc += d * d;
  }
  acc / (xs.len() - 1) as f64
}

pub fn sample_std(xs: &[f64]) -> f64 {
  sample_variance(xs, sample_mean(xs)).sqrt()
}

/// Unbiased covariance of the common prefix of `x` and `y`.
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);
  let mut acc = 0.0;
  for i in 0..n {
    acc += (x[i] - mx) * (y[i] - my);
  }
  acc / (n - 1) as f64
}

/// Pearson correlation of the common prefix, clamped to `[-1, 1]`.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Empirical `q`-quantile (`q` in `[0, 1]`) with linear interpolation between order statistics.
pub fn percentile(xs: &[f64], q: f64) -> f64 {
  if xs.is_empty() {
    return 0.0;
  }

  let mut sorted = xs.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));

  let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
  let lo = pos.floor() as usize;
  let hi = pos.ceil() as usize;
  let frac = pos - lo as f64;
  sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn variance_needs_two_points() {
    assert_eq!(sample_variance(&[1.0], 1.0), 0.0);
    assert_abs_diff_eq!(sample_std(&[1.0, 3.0]), 2.0_f64.sqrt(), epsilon = 1e-12);
  }

  #[test]
  fn percentile_interpolates() {
    let xs = [4.0, 1.0, 3.0, 2.0, 5.0];
    assert_abs_diff_eq!(percentile(&xs, 0.0), 1.0);
    assert_abs_diff_eq!(percentile(&xs, 0.5), 3.0);
    assert_abs_diff_eq!(percentile(&xs, 0.1), 1.4, epsilon = 1e-12);
    assert_abs_diff_eq!(percentile(&xs, 1.0), 5.0);
  }

  #[test]
  fn pearson_of_scaled_series_is_one() {
    let x = [0.01, -0.02, 0.03, 0.005];
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    assert_abs_diff_eq!(pearson(&x, &y), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(covariance(&x, &y), 2.0 * covariance(&x, &x), epsilon = 1e-15);
  }
}
