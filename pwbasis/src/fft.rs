//! 3-D FFTs on the plane-wave grid
//!
//! Grid arrays are stored with the first index running fastest,
//! `idx = i0 + n0 * (i1 + n1 * i2)`. The coefficient ordering matches the FFT
//! ordering: index `i` along an axis holds the Miller index returned by
//! [`miller_index`].
//!
//! Normalization is chosen so that orbitals normalized in coefficient space
//! are normalized in real space with the volume element `dvol = Ω / n_fft`:
//!
//! ψ(r) = Ω^{-1/2} Σ_G c_G e^{iG·r},    c_G = Ω^{1/2} / n_fft · Σ_r ψ(r) e^{-iG·r}

use crate::error::BasisError;
use crate::CZERO;
use nalgebra::DVector;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Maps an FFT index along an axis of length `n` to its signed Miller index.
pub fn miller_index(i: usize, n: usize) -> i64 {
    let (i, n) = (i as i64, n as i64);
    if i <= (n - 1) / 2 {
        i
    } else {
        i - n
    }
}

#[derive(Clone)]
pub struct FftGrid {
    dims: [usize; 3],
    volume: f64,
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
}

impl std::fmt::Debug for FftGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftGrid")
            .field("dims", &self.dims)
            .field("volume", &self.volume)
            .finish()
    }
}

impl FftGrid {
    pub fn new(dims: [usize; 3], volume: f64) -> Result<Self, BasisError> {
        if dims.iter().any(|&n| n == 0) {
            return Err(BasisError::InvalidCell(format!(
                "FFT dimensions must be positive, got {:?}",
                dims
            )));
        }
        if !(volume > 0.0) {
            return Err(BasisError::InvalidCell(format!(
                "cell volume must be positive, got {}",
                volume
            )));
        }

        let mut planner = FftPlanner::<f64>::new();
        let forward = dims.map(|n| planner.plan_fft_forward(n));
        let inverse = dims.map(|n| planner.plan_fft_inverse(n));
        Ok(FftGrid {
            dims,
            volume,
            forward,
            inverse,
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits a flat index into its three grid coordinates.
    pub fn coordinates(&self, idx: usize) -> [usize; 3] {
        let [n0, n1, _] = self.dims;
        [idx % n0, (idx / n0) % n1, idx / (n0 * n1)]
    }

    /// Flat index of a grid coordinate.
    pub fn index(&self, coord: [usize; 3]) -> usize {
        let [n0, n1, _] = self.dims;
        coord[0] + n0 * (coord[1] + n1 * coord[2])
    }

    /// Fractional coordinates of a grid point.
    pub fn fractional_position(&self, idx: usize) -> [f64; 3] {
        let c = self.coordinates(idx);
        [
            c[0] as f64 / self.dims[0] as f64,
            c[1] as f64 / self.dims[1] as f64,
            c[2] as f64 / self.dims[2] as f64,
        ]
    }

    /// Plane-wave coefficients to real-space values.
    pub fn to_real(&self, coeffs: &DVector<Complex64>) -> DVector<Complex64> {
        let mut data: Vec<Complex64> = coeffs.iter().copied().collect();
        self.transform(&mut data, &self.inverse);
        let scale = 1.0 / self.volume.sqrt();
        DVector::from_iterator(data.len(), data.into_iter().map(|v| v * scale))
    }

    /// Real-space values to plane-wave coefficients.
    pub fn to_fourier(&self, values: &DVector<Complex64>) -> DVector<Complex64> {
        let mut data: Vec<Complex64> = values.iter().copied().collect();
        self.transform(&mut data, &self.forward);
        let scale = self.volume.sqrt() / self.len() as f64;
        DVector::from_iterator(data.len(), data.into_iter().map(|v| v * scale))
    }

    fn transform(&self, data: &mut [Complex64], plans: &[Arc<dyn Fft<f64>>; 3]) {
        let [n0, n1, _] = self.dims;
        let strides = [1, n0, n0 * n1];
        let total = data.len();

        for axis in 0..3 {
            let len = self.dims[axis];
            if len == 1 {
                continue;
            }
            let stride = strides[axis];
            let mut line = vec![CZERO; len];
            for start in 0..total {
                // only line origins
                if (start / stride) % len != 0 {
                    continue;
                }
                for (j, v) in line.iter_mut().enumerate() {
                    *v = data[start + j * stride];
                }
                plans[axis].process(&mut line);
                for (j, v) in line.iter().enumerate() {
                    data[start + j * stride] = *v;
                }
            }
        }
    }
}
