use std::io::Write;

use sieve::pipeline::Pipeline;
use sieve_config::shared::OutputFormat;
use tracing::info;

use crate::error::CliResult;

/// Runs the sieve for `upper_bound` and returns the primes in ascending order.
pub async fn run_sieve(upper_bound: i64) -> CliResult<Vec<u64>> {
    let mut pipeline = Pipeline::new(upper_bound);
    pipeline.start().await?;

    let report = pipeline.wait().await?;

    info!(
        primes = report.primes.len(),
        stages = report.stages_spawned,
        peak_live_stages = report.peak_live_stages,
        "sieve completed"
    );

    Ok(report.primes)
}

/// Writes `primes` to `out` in the requested format.
pub fn write_primes<W: Write>(out: &mut W, primes: &[u64], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Lines => {
            for prime in primes {
                writeln!(out, "{prime}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, primes).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
    }

    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(primes: &[u64], format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_primes(&mut out, primes, format).unwrap();

        String::from_utf8(out).unwrap()
    }

    #[test]
    fn lines_format_writes_one_prime_per_line() {
        assert_eq!(render(&[2, 3, 5], OutputFormat::Lines), "2\n3\n5\n");
        assert_eq!(render(&[], OutputFormat::Lines), "");
    }

    #[test]
    fn json_format_writes_single_array() {
        assert_eq!(render(&[2, 3, 5], OutputFormat::Json), "[2,3,5]\n");
        assert_eq!(render(&[], OutputFormat::Json), "[]\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_sieve_returns_primes() {
        assert_eq!(run_sieve(20).await.unwrap(), vec![2, 3, 5, 7, 11, 13, 17, 19]);
    }
}
