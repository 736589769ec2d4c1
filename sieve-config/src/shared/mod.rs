//! Configuration types shared by the sieve binaries.

mod output;
mod sieve;

pub use output::OutputFormat;
pub use sieve::SieveConfig;

use thiserror::Error;

/// Errors raised when a deserialized configuration breaks an invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field holds a value outside of its allowed range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
