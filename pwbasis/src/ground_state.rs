//! Ground states obtained by dense diagonalization of a fixed Hamiltonian

extern crate nalgebra as na;

use crate::basis::PlaneWaveBasis;
use crate::density::compute_density;
use crate::eigen::eigh_lowest;
use crate::error::BasisError;
use crate::hamiltonian::Hamiltonian;
use crate::occupation::compute_occupation;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::info;

/// Eigenpairs, occupations and Fermi level of a Hamiltonian.
///
/// Read-only input to the response solvers; rebuild it when the Hamiltonian changes.
#[derive(Clone)]
pub struct GroundState {
    pub ham: Hamiltonian,
    pub psi: Vec<DMatrix<Complex64>>,
    pub eigenvalues: Vec<DVector<f64>>,
    pub occupation: Vec<DVector<f64>>,
    pub fermi_level: f64,
}

impl GroundState {
    /// Diagonalize every block densely and keep the `n_bands` lowest states.
    pub fn from_dense_diagonalization(
        ham: Hamiltonian,
        n_bands: usize,
        tol_n_elec: f64,
    ) -> Result<Self, BasisError> {
        let (eigenvalues, psi): (Vec<_>, Vec<_>) = ham
            .blocks
            .par_iter()
            .map(|block| eigh_lowest(&block.dense(), n_bands))
            .unzip();

        let (occupation, fermi_level) = compute_occupation(&ham.basis, &eigenvalues, tol_n_elec)?;

        info!(
            "Ground state: {} bands per k-point, Fermi level {:.8} Ha",
            n_bands.min(ham.basis.n_fft()),
            fermi_level
        );

        Ok(GroundState {
            ham,
            psi,
            eigenvalues,
            occupation,
            fermi_level,
        })
    }

    pub fn basis(&self) -> &PlaneWaveBasis {
        &self.ham.basis
    }

    pub fn n_bands(&self, ik: usize) -> usize {
        self.psi[ik].ncols()
    }

    /// Electron density on the real-space grid (n_fft x n_spin).
    pub fn density(&self) -> DMatrix<f64> {
        compute_density(self.basis(), &self.psi, &self.occupation)
    }
}
