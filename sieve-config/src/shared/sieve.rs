use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{OutputFormat, ValidationError};

/// Settings of the sieve command line tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SieveConfig {
    /// Upper bound used when none is given on the command line.
    #[serde(default)]
    pub upper_bound: Option<u64>,
    #[serde(default)]
    pub output: OutputFormat,
}

impl SieveConfig {
    /// Largest accepted upper bound, so that every candidate fits the pipeline's signed bound.
    pub const MAX_UPPER_BOUND: u64 = i64::MAX as u64;

    /// Validates sieve configuration settings.
    ///
    /// Ensures the upper bound, when present, is positive and representable as a signed bound.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(upper_bound) = self.upper_bound {
            if upper_bound == 0 || upper_bound > Self::MAX_UPPER_BOUND {
                return Err(ValidationError::InvalidFieldValue {
                    field: "upper_bound".to_string(),
                    constraint: format!("must be between 1 and {}", Self::MAX_UPPER_BOUND),
                });
            }
        }

        Ok(())
    }
}

impl Config for SieveConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        SieveConfig::validate(self)
    }
}
