use crate::primality::is_prime;

/// Returns the primes lower than or equal to `upper_bound` by testing every candidate on its own.
///
/// Used as the expected output when checking pipeline runs.
pub fn reference_primes(upper_bound: i64) -> Vec<u64> {
    (2..=upper_bound.max(1))
        .filter(|n| is_prime(*n))
        .filter_map(|n| u64::try_from(n).ok())
        .collect()
}

/// Returns the number of primes lower than or equal to `upper_bound`.
pub fn prime_count(upper_bound: i64) -> usize {
    reference_primes(upper_bound).len()
}
