//! Symmetry groups acting on the real-space grid
//!
//! An operation is stored as the permutation of grid points it induces,
//! `(g x)(r) = x(perm[r])`. Symmetrization averages over the group, which is
//! a projection (idempotent) as long as the operations form a group.

use crate::error::BasisError;
use crate::fft::FftGrid;
use nalgebra::DMatrix;
use num_complex::Complex64;

#[derive(Clone, Debug, PartialEq)]
pub struct SymmetryGroup {
    n_fft: usize,
    operations: Vec<Vec<usize>>,
}

impl SymmetryGroup {
    /// The group containing only the identity.
    pub fn trivial(n_fft: usize) -> Self {
        SymmetryGroup {
            n_fft,
            operations: vec![(0..n_fft).collect()],
        }
    }

    /// Identity and inversion through the origin, r -> -r.
    pub fn inversion(fft: &FftGrid) -> Self {
        let dims = fft.dims();
        let inverted = (0..fft.len())
            .map(|idx| {
                let c = fft.coordinates(idx);
                fft.index([
                    (dims[0] - c[0]) % dims[0],
                    (dims[1] - c[1]) % dims[1],
                    (dims[2] - c[2]) % dims[2],
                ])
            })
            .collect();
        let mut group = Self::trivial(fft.len());
        if group.operations[0] != inverted {
            group.operations.push(inverted);
        }
        group
    }

    /// Build a group from explicit grid permutations. The identity is added
    /// when missing; closure under composition is the caller's responsibility.
    pub fn from_permutations(n_fft: usize, permutations: Vec<Vec<usize>>) -> Result<Self, BasisError> {
        for (index, perm) in permutations.iter().enumerate() {
            if perm.len() != n_fft {
                return Err(BasisError::InvalidSymmetry {
                    index,
                    reason: format!("expected {} grid points, got {}", n_fft, perm.len()),
                });
            }
            let mut seen = vec![false; n_fft];
            for &p in perm {
                if p >= n_fft || seen[p] {
                    return Err(BasisError::InvalidSymmetry {
                        index,
                        reason: format!("entry {} is out of range or repeated", p),
                    });
                }
                seen[p] = true;
            }
        }

        let identity: Vec<usize> = (0..n_fft).collect();
        let mut operations = vec![identity.clone()];
        operations.extend(permutations.into_iter().filter(|p| *p != identity));
        Ok(SymmetryGroup { n_fft, operations })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_trivial(&self) -> bool {
        self.operations.len() <= 1
    }

    /// Project a real-space array (n_fft x n_spin) onto the invariant subspace.
    pub fn symmetrize(&self, x: &DMatrix<Complex64>) -> DMatrix<Complex64> {
        if self.is_trivial() {
            return x.clone();
        }
        let weight = 1.0 / self.operations.len() as f64;
        DMatrix::from_fn(x.nrows(), x.ncols(), |r, s| {
            self.operations
                .iter()
                .map(|perm| x[(perm[r], s)])
                .sum::<Complex64>()
                * weight
        })
    }

    pub fn symmetrize_real(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        if self.is_trivial() {
            return x.clone();
        }
        let weight = 1.0 / self.operations.len() as f64;
        DMatrix::from_fn(x.nrows(), x.ncols(), |r, s| {
            self.operations
                .iter()
                .map(|perm| x[(perm[r], s)])
                .sum::<f64>()
                * weight
        })
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }
}
