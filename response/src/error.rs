use pwbasis::BasisError;
use thiserror::Error;

/// Errors raised by the response solvers.
///
/// Numerical non-convergence is not an error: it is logged and the best
/// iterate is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    /// The requested computation does not support the supplied setup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A real-space array or per-k-point input does not match the ground state.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: String,
        got: String,
    },

    /// A precomputed context does not belong to the ground state it is used with.
    #[error("Context mismatch: {0}")]
    ContextMismatch(String),

    /// The momentum shift does not map the k-point set onto itself.
    #[error("Momentum shift {q:?} is not commensurate with the k-point grid")]
    IncommensurateShift { q: [f64; 3] },

    #[error(transparent)]
    Basis(BasisError),
}

impl From<BasisError> for ResponseError {
    fn from(err: BasisError) -> Self {
        match err {
            BasisError::IncommensurateShift { q, .. } => ResponseError::IncommensurateShift { q },
            BasisError::ShapeMismatch {
                expected_rows,
                expected_cols,
                rows,
                cols,
            } => ResponseError::DimensionMismatch {
                what: "real-space array",
                expected: format!("{}x{}", expected_rows, expected_cols),
                got: format!("{}x{}", rows, cols),
            },
            other => ResponseError::Basis(other),
        }
    }
}
