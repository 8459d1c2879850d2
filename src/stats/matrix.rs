//! # Covariance Matrices
//!
//! $$
//! \Sigma^{-1} = V \Lambda^{-1} V^\top,\qquad \kappa(\Sigma)=\frac{\lambda_{\max}}{\lambda_{\min}}
//! $$
//!
//! Sample covariance construction and a conditioning-aware inverse.

use nalgebra::DMatrix;
use nalgebra::DVector;

use super::moments::covariance;

/// Reciprocal condition number below which a covariance matrix is treated as singular.
pub const MIN_RCOND: f64 = 1e-12;

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn mat_vec_mul(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat
    .iter()
    .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
    .collect()
}

/// Align multiple return series to common tail length.
pub fn align_return_series(all_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let min_len = all_returns.iter().map(|r| r.len()).min().unwrap_or(0);
  all_returns
    .iter()
    .map(|r| r[r.len().saturating_sub(min_len)..].to_vec())
    .collect()
}

/// Unbiased sample covariance matrix of aligned return series.
pub fn sample_covariance_matrix(aligned_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = aligned_returns.len();
  let mut cov = vec![vec![0.0; n]; n];

  for i in 0..n {
    for j in i..n {
      let c = covariance(&aligned_returns[i], &aligned_returns[j]);
      cov[i][j] = c;
      cov[j][i] = c;
    }
  }

  cov
}

/// Invert a symmetric covariance matrix through its eigen-decomposition.
///
/// Returns `None` for empty, non-square or non-finite input, and when the
/// matrix is singular or ill-conditioned (`λ_min / λ_max < MIN_RCOND`).
pub fn invert_covariance(cov: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
  let n = cov.len();
  if n == 0 || cov.iter().any(|row| row.len() != n) {
    return None;
  }
  if cov.iter().flatten().any(|v| !v.is_finite()) {
    return None;
  }

  let flat: Vec<f64> = cov.iter().flatten().copied().collect();
  let eig = DMatrix::from_row_slice(n, n, &flat).symmetric_eigen();

  let max_eig = eig.eigenvalues.max();
  let min_eig = eig.eigenvalues.min();
  if max_eig <= f64::MIN_POSITIVE || min_eig / max_eig < MIN_RCOND {
    return None;
  }

  let inv_diag = DVector::from_iterator(n, eig.eigenvalues.iter().map(|&l| 1.0 / l));
  let inv = &eig.eigenvectors * DMatrix::from_diagonal(&inv_diag) * eig.eigenvectors.transpose();

  let out: Vec<Vec<f64>> = (0..n)
    .map(|i| (0..n).map(|j| inv[(i, j)]).collect())
    .collect();
  if out.iter().flatten().any(|v| !v.is_finite()) {
    return None;
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn inverse_times_matrix_is_identity() {
    let cov = vec![
      vec![0.04, 0.01, 0.0],
      vec![0.01, 0.09, 0.02],
      vec![0.0, 0.02, 0.16],
    ];
    let inv = invert_covariance(&cov).unwrap();

    for i in 0..3 {
      for j in 0..3 {
        let v: f64 = (0..3).map(|k| cov[i][k] * inv[k][j]).sum();
        assert_abs_diff_eq!(v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-9);
      }
    }
  }

  #[test]
  fn collinear_returns_are_singular() {
    let a = vec![0.01, -0.02, 0.015, 0.003, -0.007];
    let b: Vec<f64> = a.iter().map(|x| 3.0 * x).collect();
    let cov = sample_covariance_matrix(&[a, b]);
    assert!(invert_covariance(&cov).is_none());
  }

  #[test]
  fn zero_matrix_is_singular() {
    assert!(invert_covariance(&[vec![0.0, 0.0], vec![0.0, 0.0]]).is_none());
    assert!(invert_covariance(&[]).is_none());
  }
}
