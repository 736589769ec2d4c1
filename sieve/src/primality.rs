/// Returns whether `n` is prime using trial division.
///
/// Values lower than two are never prime. Divisors are tried while `i * i <= n`.
pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }

    let mut i: i64 = 2;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }

    true
}
