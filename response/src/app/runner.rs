use crate::config::{Args, CosineTerm, Config};
use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::{DMatrix, DVector};
use pwbasis::{Complex64, GroundState, Hamiltonian, Model, PlaneWaveBasis, SymmetryGroup};
use response::{apply_chi0_with_context, compute_chi0, ApplyChi0Context, BandToleranceHeuristic, Chi0Options};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Electron-count tolerance of the ground-state occupations
const GROUND_STATE_TOL_N_ELEC: f64 = 1e-10;

/// Unoccupied bands computed on top of the filled ones when `n_bands` is not set
const DEFAULT_EXTRA_BANDS: usize = 3;

pub struct ResponseRun {
    pub q: [f64; 3],
    pub delta_v: DMatrix<Complex64>,
    pub delta_rho: DMatrix<Complex64>,
    pub options: Chi0Options,
    pub elapsed: Duration,
}

/// Sum of cosine terms on the real-space grid, identical for every spin channel.
pub fn cosine_field(basis: &PlaneWaveBasis, terms: &[CosineTerm]) -> DMatrix<f64> {
    DMatrix::from_fn(basis.n_fft(), basis.n_spin(), |idx, _| {
        let x = basis.fft.fractional_position(idx);
        terms
            .iter()
            .map(|t| {
                let phase: f64 = (0..3).map(|a| t.miller[a] as f64 * x[a]).sum();
                t.amplitude * (2.0 * PI * phase).cos()
            })
            .sum::<f64>()
    })
}

pub fn build_ground_state(config: &Config, args: &Args) -> Result<GroundState> {
    let system = &config.system;
    let temperature = args.temperature.unwrap_or(config.temperature());

    let mut model = Model::new(system.lattice, system.n_electrons)?
        .with_spin(config.n_spin())?
        .with_temperature(temperature, config.smearing());
    if let Some(fermi_level) = system.fermi_level {
        info!("Fermi level pinned at {:.6} Ha", fermi_level);
        model = model.with_fixed_fermi_level(fermi_level);
    }

    let basis = PlaneWaveBasis::new(model, system.fft_size, config.kgrid())
        .wrap_err("Failed to set up the plane-wave basis")?;
    let basis = match config.symmetry().to_lowercase().as_str() {
        "none" => basis,
        "inversion" => {
            let group = SymmetryGroup::inversion(&basis.fft);
            basis.with_symmetry(group)?
        }
        other => return Err(eyre!("Unknown symmetry setting: {}", other)),
    };

    let potential = cosine_field(&basis, &config.potential());
    let n_bands = system
        .n_bands
        .unwrap_or_else(|| default_n_bands(&basis.model))
        .min(basis.n_fft());
    let ham = Hamiltonian::new(Arc::new(basis), &potential)?;

    info!("\nDiagonalizing {} Hamiltonian blocks...", ham.blocks.len());
    let gs = GroundState::from_dense_diagonalization(ham, n_bands, GROUND_STATE_TOL_N_ELEC)
        .wrap_err("Ground-state calculation failed")?;
    Ok(gs)
}

fn default_n_bands(model: &Model) -> usize {
    let per_kpoint = model.n_electrons / (model.filled_occupation() * model.n_spin as f64);
    per_kpoint.ceil() as usize + DEFAULT_EXTRA_BANDS
}

pub fn resolve_options(config: &Config, args: &Args) -> Chi0Options {
    let params = config.response_params();
    let defaults = Chi0Options::default();
    let band_tolerance = args
        .band_tolerance
        .clone()
        .or(params.band_tolerance)
        .map(|name| BandToleranceHeuristic::from_name(&name))
        .unwrap_or_default();

    Chi0Options {
        tol: args.tol.or(params.tol).unwrap_or(defaults.tol),
        miniter: params.miniter.unwrap_or(defaults.miniter),
        maxiter: args.maxiter.or(params.maxiter).unwrap_or(defaults.maxiter),
        occupation_threshold: params
            .occupation_threshold
            .unwrap_or(defaults.occupation_threshold),
        band_tolerance,
    }
}

pub fn run_response(gs: &GroundState, config: &Config, args: &Args) -> Result<ResponseRun> {
    let options = resolve_options(config, args);
    let q = config.q();
    let delta_v = cosine_field(gs.basis(), &config.perturbation_terms()).map(|v| Complex64::new(v, 0.0));

    info!("\nApplying χ0 with q = {:?}", q);
    info!("  Tolerance: {:.3e} ({:?} band scaling)", options.tol, options.band_tolerance);
    info!("  Max iterations: {}", options.maxiter);

    let start = Instant::now();
    let ctx = ApplyChi0Context::new(gs, q, options.occupation_threshold, options.band_tolerance)?;
    let delta_rho = apply_chi0_with_context(gs, &ctx, &delta_v, options)?;
    let elapsed = start.elapsed();

    Ok(ResponseRun {
        q,
        delta_v,
        delta_rho,
        options,
        elapsed,
    })
}

/// Largest deviation between the applied and the dense χ0, or `None` when
/// the dense path does not apply.
pub fn compare_explicit(gs: &GroundState, run: &ResponseRun) -> Result<Option<f64>> {
    if run.q != [0.0, 0.0, 0.0] {
        info!("Skipping explicit χ0 comparison at finite q");
        return Ok(None);
    }
    if !gs.basis().symmetry().is_trivial() {
        info!("Skipping explicit χ0 comparison with symmetry enabled");
        return Ok(None);
    }

    let chi0 = compute_chi0(&gs.ham, None)?;
    let delta_v: Vec<f64> = run.delta_v.iter().map(|v| v.re).collect();
    let expected = &chi0 * DVector::from_vec(delta_v);
    let deviation = expected
        .iter()
        .zip(run.delta_rho.iter())
        .map(|(e, d)| (e - d.re).abs())
        .fold(0.0, f64::max);
    Ok(Some(deviation))
}
