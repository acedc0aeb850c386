use super::runner::ResponseRun;
use itertools::izip;
use pwbasis::GroundState;
use tracing::info;

pub fn report_ground_state(gs: &GroundState) {
    let basis = gs.basis();
    info!("\nGround state finished.");
    info!("  Fermi level: {:.8} Ha", gs.fermi_level);

    for (ik, kpoint) in basis.kpoints.iter().enumerate() {
        info!(
            "\n  k-point {} (spin {}) at [{:+.4}, {:+.4}, {:+.4}], weight {:.4}:",
            ik, kpoint.spin, kpoint.coordinate[0], kpoint.coordinate[1], kpoint.coordinate[2], basis.kweights[ik]
        );
        for (n, energy, occupation) in izip!(0.., gs.eigenvalues[ik].iter(), gs.occupation[ik].iter()) {
            info!("    Band {:>2}: {:+.8} Ha  f = {:.6}", n + 1, energy, occupation);
        }
    }
}

pub fn report_response(gs: &GroundState, run: &ResponseRun) {
    let dvol = gs.basis().dvol();
    let integral: f64 = run.delta_rho.iter().map(|v| v.re).sum::<f64>() * dvol;
    let max_abs = run.delta_rho.iter().map(|v| v.norm()).fold(0.0, f64::max);

    info!("\nDensity response finished in {:.3} s.", run.elapsed.as_secs_f64());
    info!("  |δV|        = {:.6e}", run.delta_v.norm());
    info!("  |δρ|        = {:.6e}", run.delta_rho.norm());
    info!("  max |δρ(r)| = {:.6e}", max_abs);
    info!("  ∫ δρ dr     = {:+.3e}", integral);
}

pub fn report_explicit_comparison(deviation: f64, tol: f64) {
    info!("\nExplicit χ0 comparison:");
    info!("  max |χ0 δV - δρ| = {:.3e} (solver tolerance {:.1e})", deviation, tol);
}
