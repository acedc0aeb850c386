//! Sum-reduction across the workers owning disjoint sets of k-points

use num_complex::Complex64;

/// Sums a quantity over every worker that owns part of the k-point set.
///
/// Each call is a synchronization point: the result is only valid once all
/// workers have contributed.
pub trait KpointReducer: Send + Sync {
    fn sum(&self, value: f64) -> f64;

    fn max(&self, value: f64) -> f64;

    fn min(&self, value: f64) -> f64;

    fn sum_in_place(&self, values: &mut [f64]);

    fn sum_complex_in_place(&self, values: &mut [Complex64]);
}

/// Single-process reducer: every k-point is local, so reductions are identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReducer;

impl KpointReducer for LocalReducer {
    fn sum(&self, value: f64) -> f64 {
        value
    }

    fn max(&self, value: f64) -> f64 {
        value
    }

    fn min(&self, value: f64) -> f64 {
        value
    }

    fn sum_in_place(&self, _values: &mut [f64]) {}

    fn sum_complex_in_place(&self, _values: &mut [Complex64]) {}
}
