//! Input/Output operations for response calculations

use color_eyre::eyre::{Result, WrapErr};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

/// Setup output configuration (logging, etc.)
pub fn setup_output(output_file: Option<&String>, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Some(file) = output_file {
        tracing::info!("Density response will be written to: {}", file);
    }
}

/// JSON layout of a density response on the real-space grid
#[derive(Debug, Serialize)]
pub struct DensityResponseDump {
    pub fft_size: [usize; 3],
    pub n_spin: usize,
    pub q: [f64; 3],
    /// Grid values, spin channels one after the other
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub integral: f64,
}

impl DensityResponseDump {
    pub fn new(fft_size: [usize; 3], q: [f64; 3], delta_rho: &DMatrix<Complex64>, dvol: f64) -> Self {
        DensityResponseDump {
            fft_size,
            n_spin: delta_rho.ncols(),
            q,
            real: delta_rho.iter().map(|v| v.re).collect(),
            imag: delta_rho.iter().map(|v| v.im).collect(),
            integral: delta_rho.iter().map(|v| v.re).sum::<f64>() * dvol,
        }
    }
}

/// Write the density response to a JSON file
pub fn write_density_response(path: &str, dump: &DensityResponseDump) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("Unable to create output file: {}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dump)
        .wrap_err_with(|| format!("Failed to write density response to {}", path))?;
    tracing::info!("Density response written to {}", path);
    Ok(())
}
