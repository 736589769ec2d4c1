//! Metrics definitions for sieve pipeline monitoring.

/// Label for error kind in metrics.
pub const ERROR_KIND_LABEL: &str = "error_kind";

/// Counter for total filter stages spawned, including terminal empty stages.
pub const SIEVE_STAGES_SPAWNED_TOTAL: &str = "sieve_stages_spawned_total";

/// Counter for total primes secured by filter stages.
pub const SIEVE_PRIMES_DISCOVERED_TOTAL: &str = "sieve_primes_discovered_total";

/// Counter for total values discarded by filter stages because they were multiples of the
/// stage's prime.
pub const SIEVE_VALUES_DISCARDED_TOTAL: &str = "sieve_values_discarded_total";

/// Gauge for the number of filter stages currently alive.
pub const SIEVE_LIVE_STAGES: &str = "sieve_live_stages";

/// Counter for total pipeline runs that ended with an error.
pub const SIEVE_PIPELINE_FAILURES_TOTAL: &str = "sieve_pipeline_failures_total";
