//! # Stats
//!
//! $$
//! \Sigma_{ij} = \frac{1}{T-1}\sum_t (r_{i,t}-\bar r_i)(r_{j,t}-\bar r_j)
//! $$
//!
//! Sample moments and covariance utilities shared by strategies and risk metrics.

pub mod matrix;
pub mod moments;

pub use matrix::align_return_series;
pub use matrix::dot;
pub use matrix::invert_covariance;
pub use matrix::mat_vec_mul;
pub use matrix::sample_covariance_matrix;
pub use moments::covariance;
pub use moments::percentile;
pub use moments::pearson;
pub use moments::sample_mean;
pub use moments::sample_std;
pub use moments::sample_variance;
