//! Reusable band partition and tolerance scaling for repeated χ0 applications
//!
//! An [`ApplyChi0Context`] belongs to one ground state and one momentum shift.
//! It is rebuilt whenever either changes.

extern crate nalgebra as na;

use crate::error::ResponseError;
use na::{DMatrix, DVector};
use num_complex::Complex64;
use pwbasis::{GroundState, KpointShift};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Occupation threshold used when none is given: max(1e-10, 100 ε_machine).
pub fn default_occupation_threshold() -> f64 {
    1e-10_f64.max(100.0 * f64::EPSILON)
}

/// How the Sternheimer tolerance is scaled per band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandToleranceHeuristic {
    /// Same tolerance for every band
    #[default]
    Uniform,
    /// Worst-case bound using the sup norm of each orbital
    Guaranteed,
    /// Mean orbital magnitude, errors adding in quadrature
    Balanced,
}

impl BandToleranceHeuristic {
    /// Parse a heuristic name, falling back to `Uniform` on unknown names.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "guaranteed" => BandToleranceHeuristic::Guaranteed,
            "balanced" => BandToleranceHeuristic::Balanced,
            "uniform" => BandToleranceHeuristic::Uniform,
            _ => {
                warn!(name = name, "Unknown band tolerance heuristic, using uniform tolerances");
                BandToleranceHeuristic::Uniform
            }
        }
    }
}

/// Orbitals of a ground state split into occupied and extra bands.
#[derive(Debug, Clone)]
pub struct PartitionedBands {
    pub psi_occ: Vec<DMatrix<Complex64>>,
    pub eigenvalues_occ: Vec<DVector<f64>>,
    pub occupation_occ: Vec<DVector<f64>>,
    pub psi_extra: Vec<DMatrix<Complex64>>,
}

#[derive(Debug, Clone)]
pub struct ApplyChi0Context {
    q: [f64; 3],
    occupation_threshold: f64,
    heuristic: BandToleranceHeuristic,
    n_bands: Vec<usize>,
    occupied: Vec<Vec<usize>>,
    extra: Vec<Vec<usize>>,
    k_to_k_minus_q: Vec<KpointShift>,
    tolerance_factors: Vec<DVector<f64>>,
}

impl ApplyChi0Context {
    pub fn new(
        gs: &GroundState,
        q: [f64; 3],
        occupation_threshold: f64,
        heuristic: BandToleranceHeuristic,
    ) -> Result<Self, ResponseError> {
        let basis = gs.basis();
        // the group acts on periodic parts, which maps a q response onto -q
        if q != [0.0, 0.0, 0.0] && !basis.symmetry().is_trivial() {
            return Err(ResponseError::Configuration(format!(
                "momentum shift {:?} requires a basis without symmetry operations",
                q
            )));
        }
        let k_to_k_minus_q = basis.k_to_k_minus_q(q)?;

        let (occupied, extra): (Vec<Vec<usize>>, Vec<Vec<usize>>) = gs
            .occupation
            .iter()
            .map(|occ| (0..occ.len()).partition::<Vec<usize>, _>(|&n| occ[n].abs() >= occupation_threshold))
            .unzip();

        let tolerance_factors = occupied
            .iter()
            .enumerate()
            .map(|(ik, bands)| band_tolerance_factors(gs, ik, bands, heuristic))
            .collect();

        debug!(
            "Band partition: {} occupied, {} extra orbitals in total",
            occupied.iter().map(Vec::len).sum::<usize>(),
            extra.iter().map(Vec::len).sum::<usize>()
        );

        Ok(ApplyChi0Context {
            q,
            occupation_threshold,
            heuristic,
            n_bands: gs.psi.iter().map(|p| p.ncols()).collect(),
            occupied,
            extra,
            k_to_k_minus_q,
            tolerance_factors,
        })
    }

    pub fn q(&self) -> [f64; 3] {
        self.q
    }

    pub fn is_q_zero(&self) -> bool {
        self.q == [0.0, 0.0, 0.0]
    }

    pub fn occupation_threshold(&self) -> f64 {
        self.occupation_threshold
    }

    pub fn heuristic(&self) -> BandToleranceHeuristic {
        self.heuristic
    }

    pub fn occupied_bands(&self, ik: usize) -> &[usize] {
        &self.occupied[ik]
    }

    pub fn extra_bands(&self, ik: usize) -> &[usize] {
        &self.extra[ik]
    }

    pub fn k_to_k_minus_q(&self) -> &[KpointShift] {
        &self.k_to_k_minus_q
    }

    /// Per-band factors applied to the Sternheimer tolerance, indexed like the
    /// occupied bands of each k-point.
    pub fn tolerance_factors(&self) -> &[DVector<f64>] {
        &self.tolerance_factors
    }

    /// Fails when the ground state has a different k-point or band layout.
    pub fn check(&self, gs: &GroundState) -> Result<(), ResponseError> {
        if gs.psi.len() != self.n_bands.len() {
            return Err(ResponseError::ContextMismatch(format!(
                "context has {} k-points, ground state has {}",
                self.n_bands.len(),
                gs.psi.len()
            )));
        }
        for (ik, (psi, &n)) in gs.psi.iter().zip(self.n_bands.iter()).enumerate() {
            if psi.ncols() != n {
                return Err(ResponseError::ContextMismatch(format!(
                    "k-point {}: context has {} bands, ground state has {}",
                    ik,
                    n,
                    psi.ncols()
                )));
            }
        }
        Ok(())
    }

    /// Select the occupied and extra orbitals of `gs`.
    pub fn partition(&self, gs: &GroundState) -> PartitionedBands {
        let select_values = |v: &DVector<f64>, bands: &[usize]| {
            DVector::from_iterator(bands.len(), bands.iter().map(|&n| v[n]))
        };
        PartitionedBands {
            psi_occ: gs
                .psi
                .iter()
                .zip(self.occupied.iter())
                .map(|(psi, bands)| psi.select_columns(bands.iter()))
                .collect(),
            eigenvalues_occ: gs
                .eigenvalues
                .iter()
                .zip(self.occupied.iter())
                .map(|(e, bands)| select_values(e, bands))
                .collect(),
            occupation_occ: gs
                .occupation
                .iter()
                .zip(self.occupied.iter())
                .map(|(f, bands)| select_values(f, bands))
                .collect(),
            psi_extra: gs
                .psi
                .iter()
                .zip(self.extra.iter())
                .map(|(psi, bands)| psi.select_columns(bands.iter()))
                .collect(),
        }
    }
}

fn band_tolerance_factors(
    gs: &GroundState,
    ik: usize,
    bands: &[usize],
    heuristic: BandToleranceHeuristic,
) -> DVector<f64> {
    let basis = gs.basis();
    let n_occ = bands.len() as f64;
    let weight = basis.kweights[ik];

    DVector::from_iterator(
        bands.len(),
        bands.iter().map(|&n| {
            let occ = gs.occupation[ik][n].abs();
            match heuristic {
                BandToleranceHeuristic::Uniform => 1.0,
                BandToleranceHeuristic::Guaranteed => {
                    let psi_real = basis.to_real(&gs.psi[ik].column(n).into_owned());
                    let sup_norm = psi_real.iter().map(|v| v.norm()).fold(0.0, f64::max);
                    1.0 / (2.0 * weight * occ * sup_norm * n_occ)
                }
                BandToleranceHeuristic::Balanced => {
                    basis.volume().sqrt() / (2.0 * weight * occ * n_occ.sqrt())
                }
            }
        }),
    )
}
