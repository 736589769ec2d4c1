//! Configuration loading for the sieve binaries.

pub mod environment;
pub mod load;
pub mod shared;

pub use load::{
    Config, LoadConfigError, configuration_directory_exists, load_config, load_config_from,
};
