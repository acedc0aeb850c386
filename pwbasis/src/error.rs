use thiserror::Error;

/// Errors raised while setting up a plane-wave model or its ground state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BasisError {
    /// A lattice length or FFT dimension is not strictly positive.
    #[error("Invalid cell: {0}")]
    InvalidCell(String),

    /// A real-space array does not match the (n_fft x n_spin) layout of the basis.
    #[error("Array shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// The spin count is neither 1 nor 2.
    #[error("Unsupported number of spin components: {0}")]
    UnsupportedSpin(usize),

    /// Zero-temperature filling needs an integer number of bands per k-point.
    #[error("Cannot fill {n_electrons} electrons with integer occupations at zero temperature")]
    FractionalFilling { n_electrons: f64 },

    /// Zero-temperature filling found HOMO above LUMO.
    #[error("No band gap at zero temperature (HOMO {homo:.6} >= LUMO {lumo:.6}); use a finite temperature")]
    NoBandGap { homo: f64, lumo: f64 },

    /// Not enough bands were computed to hold all electrons.
    #[error("{n_bands} bands per k-point cannot hold {n_electrons} electrons")]
    TooFewBands { n_bands: usize, n_electrons: f64 },

    /// The bisection on the Fermi level did not reach the electron count.
    #[error("Fermi level search failed: electron count off by {excess:.3e} after {iterations} iterations")]
    FermiLevelNotFound { excess: f64, iterations: usize },

    /// A symmetry operation is not a permutation of the FFT grid.
    #[error("Invalid symmetry operation {index}: {reason}")]
    InvalidSymmetry { index: usize, reason: String },

    /// k - q does not land on a k-point of the same spin.
    #[error("Momentum shift {q:?} maps k-point {kpoint} outside the k-point set")]
    IncommensurateShift { q: [f64; 3], kpoint: usize },
}
