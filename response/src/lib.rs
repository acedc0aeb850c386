//! Linear density response of non-interacting electrons
//!
//! Given a ground state from `pwbasis`, this crate computes δρ = χ0 δV either
//! by applying χ0 through per-band Sternheimer solves ([`apply_chi0`]) or by
//! assembling the dense χ0 matrix from a full sum over states
//! ([`compute_chi0`]).

pub mod cg;
pub mod chi0;
pub mod context;
pub mod error;
pub mod explicit;
pub mod occupation_response;
pub mod sternheimer;
pub mod wavefunction_response;


pub use chi0::{apply_chi0, apply_chi0_4p, apply_chi0_with_context, Chi0Options, ResponseQuantities};
pub use context::{ApplyChi0Context, BandToleranceHeuristic, PartitionedBands};
pub use error::ResponseError;
pub use explicit::compute_chi0;
pub use occupation_response::{compute_delta_occupation, OccupationResponse};
pub use sternheimer::{solve_sternheimer, ExtraBands, SternheimerOptions, SternheimerResult};
pub use wavefunction_response::{compute_alpha, compute_delta_psi};
