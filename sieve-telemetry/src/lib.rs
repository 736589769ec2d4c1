//! Logging setup shared by the sieve binaries and tests.

pub mod tracing;
