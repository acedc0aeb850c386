//! Matrix-free Hamiltonian H_k = ½|k+G|² + V_loc(r)

extern crate nalgebra as na;

use crate::basis::PlaneWaveBasis;
use crate::error::BasisError;
use crate::fft::FftGrid;
use crate::kpoints::Kpoint;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;
use std::sync::Arc;

/// Hamiltonian restricted to one k-point.
///
/// Immutable once built; it is shared read-only between concurrent band solves.
#[derive(Clone, Debug)]
pub struct HamiltonianBlock {
    pub kpoint: Kpoint,
    kinetic: DVector<f64>,
    potential: DVector<f64>,
    fft: FftGrid,
}

impl HamiltonianBlock {
    pub fn dim(&self) -> usize {
        self.kinetic.len()
    }

    pub fn kinetic(&self) -> &DVector<f64> {
        &self.kinetic
    }

    /// Local potential on the real-space grid for this block's spin.
    pub fn potential(&self) -> &DVector<f64> {
        &self.potential
    }

    pub fn apply(&self, x: &DVector<Complex64>) -> DVector<Complex64> {
        let mut xr = self.fft.to_real(x);
        xr.iter_mut()
            .zip(self.potential.iter())
            .for_each(|(v, p)| *v *= *p);
        let mut y = self.fft.to_fourier(&xr);
        y.iter_mut()
            .zip(x.iter().zip(self.kinetic.iter()))
            .for_each(|(yi, (xi, t))| *yi += *xi * *t);
        y
    }

    /// Apply to every column of `x`.
    pub fn apply_block(&self, x: &DMatrix<Complex64>) -> DMatrix<Complex64> {
        let columns: Vec<DVector<Complex64>> = (0..x.ncols())
            .into_par_iter()
            .map(|n| self.apply(&x.column(n).into_owned()))
            .collect();
        if columns.is_empty() {
            return DMatrix::zeros(x.nrows(), 0);
        }
        DMatrix::from_columns(&columns)
    }

    /// Dense matrix of the block, Hermitized against round-off.
    pub fn dense(&self) -> DMatrix<Complex64> {
        let n = self.dim();
        let mut h = self.apply_block(&DMatrix::identity(n, n));
        let adjoint = h.adjoint();
        h += adjoint;
        h *= Complex64::new(0.5, 0.0);
        h
    }
}

#[derive(Clone)]
pub struct Hamiltonian {
    pub basis: Arc<PlaneWaveBasis>,
    pub blocks: Vec<HamiltonianBlock>,
}

impl Hamiltonian {
    /// Build the Hamiltonian for a local potential given as (n_fft x n_spin).
    pub fn new(basis: Arc<PlaneWaveBasis>, potential: &DMatrix<f64>) -> Result<Self, BasisError> {
        basis.check_real_space_shape(potential)?;
        Ok(Self::assemble(basis, potential))
    }

    /// Free electrons, V = 0.
    pub fn free(basis: Arc<PlaneWaveBasis>) -> Self {
        let zero = DMatrix::zeros(basis.n_fft(), basis.n_spin());
        Self::assemble(basis, &zero)
    }

    fn assemble(basis: Arc<PlaneWaveBasis>, potential: &DMatrix<f64>) -> Self {
        let blocks = basis
            .kpoints
            .iter()
            .map(|k| HamiltonianBlock {
                kpoint: k.clone(),
                kinetic: basis.kinetic(k.index).clone(),
                potential: potential.column(k.spin).into_owned(),
                fft: basis.fft.clone(),
            })
            .collect();
        Hamiltonian { basis, blocks }
    }

    pub fn block(&self, ik: usize) -> &HamiltonianBlock {
        &self.blocks[ik]
    }
}
