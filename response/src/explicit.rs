//! Dense sum-over-states construction of χ0
//!
//! Reference path for small systems: every Hamiltonian block is diagonalized
//! completely and χ0 is summed over all band pairs. Cost and memory grow as
//! n_kpoints · n_bands² · n_fft², with n_bands = n_fft.

extern crate nalgebra as na;

use crate::error::ResponseError;
use itertools::Itertools;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::eigen::eigh;
use pwbasis::occupation::{compute_dos, compute_ldos, compute_occupation};
use pwbasis::Hamiltonian;
use rayon::prelude::*;
use tracing::info;

/// χ0 as a dense (n_spin·n_fft) x (n_spin·n_fft) matrix acting on real-space
/// arrays flattened spin block by spin block.
///
/// `temperature` overrides the temperature of the model when given.
pub fn compute_chi0(ham: &Hamiltonian, temperature: Option<f64>) -> Result<DMatrix<f64>, ResponseError> {
    if !ham.basis.symmetry().is_trivial() {
        return Err(ResponseError::Configuration(
            "explicit χ0 requires a basis without symmetry operations".to_string(),
        ));
    }

    let mut basis = (*ham.basis).clone();
    if let Some(t) = temperature {
        basis.model.temperature = t.max(0.0);
    }
    let model = &basis.model;
    let n_fft = basis.n_fft();
    let dvol = basis.dvol();

    let (eigenvalues, eigenvectors): (Vec<DVector<f64>>, Vec<DMatrix<Complex64>>) =
        ham.blocks.iter().map(|block| eigh(&block.dense())).unzip();
    let (_, fermi_level) = compute_occupation(&basis, &eigenvalues, 10.0 * f64::EPSILON)?;

    info!(
        "Explicit χ0: {} k-points, {} bands each, Fermi level {:.8}",
        eigenvalues.len(),
        n_fft,
        fermi_level
    );

    let mut chi0 = DMatrix::zeros(basis.n_spin() * n_fft, basis.n_spin() * n_fft);
    for (ik, (energies, vectors)) in eigenvalues.iter().zip(eigenvectors.iter()).enumerate() {
        let spin = basis.kpoints[ik].spin;
        let weight = basis.kweights[ik];
        let psi_real: Vec<DVector<Complex64>> = (0..vectors.ncols())
            .map(|n| basis.to_real(&vectors.column(n).into_owned()))
            .collect();

        let block = (0..energies.len())
            .into_par_iter()
            .map(|m| {
                let mut partial = DMatrix::zeros(n_fft, n_fft);
                for n in 0..energies.len() {
                    let ratio = model.occupation_divided_difference(energies[m], energies[n], fermi_level);
                    if ratio == 0.0 {
                        continue;
                    }
                    let factor = weight * ratio * dvol;
                    let (re, im): (Vec<f64>, Vec<f64>) = psi_real[m]
                        .iter()
                        .zip(psi_real[n].iter())
                        .map(|(a, b)| {
                            let rho = a.conj() * b;
                            (rho.re, rho.im)
                        })
                        .unzip();
                    let re = DVector::from_vec(re);
                    let im = DVector::from_vec(im);
                    partial.ger(factor, &re, &re, 1.0);
                    partial.ger(factor, &im, &im, 1.0);
                }
                partial
            })
            .reduce(|| DMatrix::zeros(n_fft, n_fft), |a, b| a + b);

        let mut target = chi0.view_mut((spin * n_fft, spin * n_fft), (n_fft, n_fft));
        target += block;
    }
    basis.reducer().sum_in_place(chi0.as_mut_slice());

    // Fermi-level shift couples all grid points and spins
    if model.is_smeared() && model.fermi_level.is_none() {
        let dos = compute_dos(&basis, fermi_level, &eigenvalues);
        let total_dos: f64 = dos.iter().sum();
        if total_dos > f64::MIN_POSITIVE {
            let ldos = compute_ldos(&basis, fermi_level, &eigenvalues, &eigenvectors);
            let ldos = DVector::from_column_slice(ldos.as_slice());
            chi0.ger(dvol / total_dos, &ldos, &ldos, 1.0);
        }
    }

    let asymmetry = (0..chi0.nrows())
        .tuple_combinations()
        .map(|(i, j)| (chi0[(i, j)] - chi0[(j, i)]).abs())
        .fold(0.0, f64::max);
    info!("Explicit χ0 assembled, max asymmetry {:.3e}", asymmetry);

    Ok(chi0)
}
