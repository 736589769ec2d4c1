//! Command line tool printing every prime up to an upper bound.
//!
//! The upper bound comes from the command line or, when omitted, from the `upper_bound` entry of
//! the configuration. Primes are written to stdout; logs and the failure report go to stderr.

use std::io;
use std::process::ExitCode;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use sieve_config::shared::{OutputFormat, SieveConfig};
use sieve_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_sieve_config;
use crate::core::{run_sieve, write_primes};
use crate::error::{CliError, CliResult};

mod config;
mod core;
mod error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputArg {
    Lines,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Lines => OutputFormat::Lines,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sieve", version, about)]
struct AppArgs {
    /// Largest integer to test, falls back to the configured `upper_bound` when omitted
    #[arg(value_parser = clap::value_parser!(u64).range(1..=SieveConfig::MAX_UPPER_BOUND))]
    upper_bound: Option<u64>,

    /// Output format, overrides the configured `output`
    #[arg(long, value_enum)]
    output: Option<OutputArg>,
}

fn main() -> ExitCode {
    let args = AppArgs::parse();

    match main_impl(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(category = err.category(), "sieve failed");
            eprint!("{}", err.render_report());

            ExitCode::FAILURE
        }
    }
}

/// Settings of a run, after merging the command line over the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunSettings {
    upper_bound: i64,
    output: OutputFormat,
}

/// Merges the command line arguments over the configuration.
///
/// Fails with a usage error when neither source provides an upper bound.
fn resolve_settings(args: &AppArgs, config: &SieveConfig) -> Result<RunSettings, clap::Error> {
    let Some(upper_bound) = args.upper_bound.or(config.upper_bound) else {
        return Err(AppArgs::command().error(
            ClapErrorKind::MissingRequiredArgument,
            "an upper bound is required, either as an argument or as `upper_bound` in the configuration",
        ));
    };

    // Both sources are bounded by `MAX_UPPER_BOUND`.
    let upper_bound = i64::try_from(upper_bound).map_err(|_| {
        AppArgs::command().error(
            ClapErrorKind::ValueValidation,
            format!("the upper bound must not exceed {}", SieveConfig::MAX_UPPER_BOUND),
        )
    })?;

    Ok(RunSettings {
        upper_bound,
        output: args.output.map(OutputFormat::from).unwrap_or(config.output),
    })
}

fn main_impl(args: AppArgs) -> CliResult<()> {
    init_tracing(env!("CARGO_BIN_NAME")).map_err(CliError::config)?;

    let config = load_sieve_config()?;
    let settings = resolve_settings(&args, &config).unwrap_or_else(|err| err.exit());

    let primes = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_sieve(settings.upper_bound))?;

    write_primes(&mut io::stdout().lock(), &primes, settings.output)
}
