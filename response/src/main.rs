//! Density-response command-line interface
//!
//! Builds a model ground state from a YAML configuration and applies χ0 to the
//! configured perturbation.

use color_eyre::eyre::Result;

mod app;
mod config;
mod io;

use app::ResponseApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    ResponseApplication::from_cli()?.run()
}
