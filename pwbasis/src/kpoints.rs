//! k-point grids and the k -> k - q correspondence

use crate::error::BasisError;
use serde::{Deserialize, Serialize};

/// Tolerance when matching fractional k-point coordinates.
const KPOINT_MATCH_TOL: f64 = 1e-8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kpoint {
    /// Position in the basis k-point list
    pub index: usize,
    /// Spin channel (0 or 1)
    pub spin: usize,
    /// Fractional coordinates in units of the reciprocal lattice
    pub coordinate: [f64; 3],
}

/// Where k - q lives: `k - q = kpoints[index] + shift`, with `shift` an
/// integer reciprocal lattice vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpointShift {
    pub index: usize,
    pub shift: [i64; 3],
}

impl KpointShift {
    pub fn is_unshifted(&self) -> bool {
        self.shift == [0, 0, 0]
    }
}

/// Γ-centred Monkhorst-Pack grid, replicated for each spin channel.
///
/// Weights of each spin channel sum to one.
pub fn monkhorst_pack(kgrid: [usize; 3], n_spin: usize) -> Result<(Vec<Kpoint>, Vec<f64>), BasisError> {
    if kgrid.iter().any(|&n| n == 0) {
        return Err(BasisError::InvalidCell(format!(
            "k-point grid must be positive, got {:?}",
            kgrid
        )));
    }

    let n_k: usize = kgrid.iter().product();
    let mut kpoints = Vec::with_capacity(n_k * n_spin);
    for spin in 0..n_spin {
        for i2 in 0..kgrid[2] {
            for i1 in 0..kgrid[1] {
                for i0 in 0..kgrid[0] {
                    let coordinate = [
                        centred(i0, kgrid[0]),
                        centred(i1, kgrid[1]),
                        centred(i2, kgrid[2]),
                    ];
                    kpoints.push(Kpoint {
                        index: kpoints.len(),
                        spin,
                        coordinate,
                    });
                }
            }
        }
    }
    let weights = vec![1.0 / n_k as f64; kpoints.len()];
    Ok((kpoints, weights))
}

fn centred(i: usize, n: usize) -> f64 {
    let c = i as f64 / n as f64;
    if c > 0.5 {
        c - 1.0
    } else {
        c
    }
}

/// For every k-point, locate k - q within the same spin channel.
pub fn k_to_k_minus_q(kpoints: &[Kpoint], q: [f64; 3]) -> Result<Vec<KpointShift>, BasisError> {
    kpoints
        .iter()
        .map(|k| {
            let target = [
                k.coordinate[0] - q[0],
                k.coordinate[1] - q[1],
                k.coordinate[2] - q[2],
            ];
            kpoints
                .iter()
                .filter(|kp| kp.spin == k.spin)
                .find_map(|kp| {
                    let diff = [
                        target[0] - kp.coordinate[0],
                        target[1] - kp.coordinate[1],
                        target[2] - kp.coordinate[2],
                    ];
                    let shift = diff.map(|d| d.round());
                    let on_lattice = diff
                        .iter()
                        .zip(shift.iter())
                        .all(|(d, s)| (d - s).abs() < KPOINT_MATCH_TOL);
                    on_lattice.then(|| KpointShift {
                        index: kp.index,
                        shift: shift.map(|s| s as i64),
                    })
                })
                .ok_or(BasisError::IncommensurateShift { q, kpoint: k.index })
        })
        .collect()
}
