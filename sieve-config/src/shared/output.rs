use std::fmt;

use serde::{Deserialize, Serialize};

/// How the primes are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One prime per line.
    #[default]
    Lines,
    /// A single JSON array.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Lines => f.write_str("lines"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}
