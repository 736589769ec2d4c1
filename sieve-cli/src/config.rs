use sieve_config::shared::SieveConfig;
use sieve_config::{configuration_directory_exists, load_config};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Loads and validates the tool configuration.
///
/// Defaults apply when there is no configuration directory in the working directory.
pub fn load_sieve_config() -> CliResult<SieveConfig> {
    if !configuration_directory_exists() {
        debug!("no configuration directory found, using defaults");

        return Ok(SieveConfig::default());
    }

    load_config::<SieveConfig>().map_err(CliError::config)
}
