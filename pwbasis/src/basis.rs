//! Plane-wave basis on the full FFT grid
//!
//! Every k-point uses all Fourier components representable on the FFT grid,
//! so N_k = n_fft and the local-potential term is an exact circular
//! convolution. Lattice-periodic parts u_k of Bloch functions are what the
//! coefficient vectors store.

use crate::error::BasisError;
use crate::fft::{miller_index, FftGrid};
use crate::kpoints::{k_to_k_minus_q, monkhorst_pack, Kpoint, KpointShift};
use crate::model::Model;
use crate::reducer::{KpointReducer, LocalReducer};
use crate::symmetry::SymmetryGroup;
use nalgebra::{DMatrix, DVector, Scalar};
use num_complex::Complex64;
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PlaneWaveBasis {
    pub model: Model,
    pub fft: FftGrid,
    pub kpoints: Vec<Kpoint>,
    pub kweights: Vec<f64>,
    kinetic: Vec<DVector<f64>>,
    symmetry: SymmetryGroup,
    reducer: Arc<dyn KpointReducer>,
}

impl PlaneWaveBasis {
    pub fn new(model: Model, fft_size: [usize; 3], kgrid: [usize; 3]) -> Result<Self, BasisError> {
        let fft = FftGrid::new(fft_size, model.unit_cell_volume())?;
        let (kpoints, kweights) = monkhorst_pack(kgrid, model.n_spin)?;
        let recip = model.reciprocal_lengths();

        let kinetic = kpoints
            .iter()
            .map(|k| {
                DVector::from_fn(fft.len(), |idx, _| {
                    let c = fft.coordinates(idx);
                    (0..3)
                        .map(|a| {
                            let g = recip[a] * (k.coordinate[a] + miller_index(c[a], fft_size[a]) as f64);
                            0.5 * g * g
                        })
                        .sum::<f64>()
                })
            })
            .collect();

        info!(
            "Plane-wave basis: fft_size={:?}, {} k-points, {} spin component(s)",
            fft_size,
            kpoints.len(),
            model.n_spin
        );

        Ok(PlaneWaveBasis {
            symmetry: SymmetryGroup::trivial(fft.len()),
            model,
            fft,
            kpoints,
            kweights,
            kinetic,
            reducer: Arc::new(LocalReducer),
        })
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryGroup) -> Result<Self, BasisError> {
        if symmetry.n_fft() != self.n_fft() {
            return Err(BasisError::InvalidSymmetry {
                index: 0,
                reason: format!(
                    "group acts on {} grid points, basis has {}",
                    symmetry.n_fft(),
                    self.n_fft()
                ),
            });
        }
        self.symmetry = symmetry;
        Ok(self)
    }

    pub fn with_reducer(mut self, reducer: Arc<dyn KpointReducer>) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn n_fft(&self) -> usize {
        self.fft.len()
    }

    pub fn n_spin(&self) -> usize {
        self.model.n_spin
    }

    pub fn n_kpoints(&self) -> usize {
        self.kpoints.len()
    }

    pub fn volume(&self) -> f64 {
        self.model.unit_cell_volume()
    }

    /// Real-space volume element Ω / n_fft.
    pub fn dvol(&self) -> f64 {
        self.volume() / self.n_fft() as f64
    }

    /// Kinetic energies ½|k+G|² of the k-point's basis functions.
    pub fn kinetic(&self, ik: usize) -> &DVector<f64> {
        &self.kinetic[ik]
    }

    pub fn symmetry(&self) -> &SymmetryGroup {
        &self.symmetry
    }

    pub fn reducer(&self) -> &dyn KpointReducer {
        self.reducer.as_ref()
    }

    pub fn to_real(&self, coeffs: &DVector<Complex64>) -> DVector<Complex64> {
        self.fft.to_real(coeffs)
    }

    pub fn to_fourier(&self, values: &DVector<Complex64>) -> DVector<Complex64> {
        self.fft.to_fourier(values)
    }

    pub fn k_to_k_minus_q(&self, q: [f64; 3]) -> Result<Vec<KpointShift>, BasisError> {
        k_to_k_minus_q(&self.kpoints, q)
    }

    /// Real-space factors e^{-iG0·r} relating the periodic part of a Bloch
    /// function at k' + G0 to the one stored at k'.
    pub fn shift_phases(&self, shift: [i64; 3]) -> DVector<Complex64> {
        DVector::from_fn(self.n_fft(), |idx, _| {
            let r = self.fft.fractional_position(idx);
            let phase: f64 = (0..3).map(|a| shift[a] as f64 * r[a]).sum();
            Complex64::from_polar(1.0, -2.0 * PI * phase)
        })
    }

    /// Check that a real-space array has the (n_fft x n_spin) layout.
    pub fn check_real_space_shape<T: Scalar>(&self, array: &DMatrix<T>) -> Result<(), BasisError> {
        if array.nrows() != self.n_fft() || array.ncols() != self.n_spin() {
            return Err(BasisError::ShapeMismatch {
                expected_rows: self.n_fft(),
                expected_cols: self.n_spin(),
                rows: array.nrows(),
                cols: array.ncols(),
            });
        }
        Ok(())
    }
}
