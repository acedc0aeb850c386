//! Command-line argument parsing for response calculations

use clap::Parser;

/// Static density response of a model system with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Write the density response as JSON to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override Sternheimer tolerance
    #[arg(long)]
    pub tol: Option<f64>,

    /// Override maximum CG iterations per band
    #[arg(long)]
    pub maxiter: Option<usize>,

    /// Override smearing temperature (Hartree)
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Band tolerance heuristic (uniform, guaranteed or balanced)
    #[arg(long)]
    pub band_tolerance: Option<String>,

    /// Also build the dense χ0 and compare
    #[arg(long)]
    pub explicit: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}
