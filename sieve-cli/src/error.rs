use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use sieve::error::SieveError;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

pub type CliResult<T> = Result<T, CliError>;

/// Captured backtrace wrapper for the variants whose source carries none.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the sieve command line tool.
#[derive(Debug)]
pub enum CliError {
    /// The pipeline failed.
    Sieve(SieveError),
    /// Configuration could not be loaded or tracing could not be set up.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// The runtime could not be built or the primes could not be written.
    Io(std::io::Error, CapturedBacktrace),
}

impl CliError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            CliError::Sieve(_) => "sieve error",
            CliError::Config(_, _) => "configuration error",
            CliError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            CliError::Sieve(err) => err.backtrace(),
            CliError::Config(_, captured) => Some(&captured.0),
            CliError::Io(_, captured) => Some(&captured.0),
        }
    }

    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        CliError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns the single diagnostic printed to stderr when the tool fails.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("sieve failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        // Aggregated sieve errors already render every inner error.
        let aggregated = matches!(self, CliError::Sieve(err) if err.errors().is_some());
        if !aggregated {
            let mut source = Error::source(self);
            let mut index = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {index}: {err}\n"));
                source = err.source();
                index += 1;
            }
        }

        if should_render_backtrace() {
            if let Some(backtrace) = self.backtrace() {
                out.push_str("backtrace:\n");
                out.push_str(&backtrace.to_string());
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Sieve(err) => write!(f, "{err}"),
            CliError::Config(source, _) => write!(f, "configuration error: {source}"),
            CliError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Sieve(err) => err.source(),
            CliError::Config(source, _) => Some(source.as_ref()),
            CliError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<SieveError> for CliError {
    fn from(err: SieveError) -> Self {
        CliError::Sieve(err)
    }
}
