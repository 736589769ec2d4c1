//! Concurrent prime sieve.
//!
//! Primes are produced by a chain of filter stages connected by single-slot channels. A source
//! generator writes the candidates `2..=N` onto the first channel; each stage keeps the first
//! value it receives as its prime, spawns a successor and forwards to it every value that is not
//! a multiple of that prime. The chain grows by one stage per prime and shuts down in cascade
//! once the end of data reaches its tail.
//!
//! ```rust,no_run
//! # async fn example() -> sieve::error::SieveResult<()> {
//! let primes = sieve::run(30).await?;
//! assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
//! # Ok(())
//! # }
//! ```

pub mod concurrency;
pub mod error;
pub mod failpoints;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod primality;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod workers;

pub use pipeline::{Pipeline, PipelineReport, run};
pub use primality::is_prime;
