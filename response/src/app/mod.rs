mod report;
mod runner;

pub use runner::{build_ground_state, compare_explicit, run_response};

use self::report::{report_explicit_comparison, report_ground_state, report_response};
use crate::config::{Args, Config};
use crate::io::{setup_output, write_density_response, DensityResponseDump};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use tracing::info;

pub struct ResponseApplication {
    args: Args,
    config: Config,
}

impl ResponseApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref(), self.args.verbose);
        info!("Configuration loaded:\n{:?}", self.config);

        let gs = build_ground_state(&self.config, &self.args)?;
        report_ground_state(&gs);

        let run = run_response(&gs, &self.config, &self.args)?;
        report_response(&gs, &run);

        let compare = self.args.explicit
            || self
                .config
                .response_params()
                .compare_explicit
                .unwrap_or(false);
        if compare {
            if let Some(deviation) = compare_explicit(&gs, &run)? {
                report_explicit_comparison(deviation, run.options.tol);
            }
        }

        if let Some(ref path) = self.args.output {
            let basis = gs.basis();
            let dump = DensityResponseDump::new(basis.fft.dims(), run.q, &run.delta_rho, basis.dvol());
            write_density_response(path, &dump)?;
        }

        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}
