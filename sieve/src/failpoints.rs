//! Named fault injection points.
//!
//! Failpoints compile to nothing unless the `failpoints` feature is enabled, in which case they
//! can be armed at runtime through [`fail::cfg`] to simulate resource exhaustion inside the
//! pipeline.

use fail::fail_point;

#[cfg(feature = "failpoints")]
use crate::bail;
#[cfg(feature = "failpoints")]
use crate::error::ErrorKind;
use crate::error::SieveResult;

/// Fires right before a stage creates its downstream channel.
pub const STAGE_BEFORE_CHANNEL_CREATE: &str = "stage.before_channel_create";

/// Fires right before a stage spawns its successor.
pub const STAGE_BEFORE_SPAWN_SUCCESSOR: &str = "stage.before_spawn_successor";

/// Fires before the source generator writes each value.
pub const GENERATOR_BEFORE_SEND: &str = "generator.before_send";

/// Evaluates the failpoint `name`, returning an error when it is armed with `return`.
///
/// The optional failpoint parameter is used as the error detail.
pub fn sieve_fail_point(name: &str) -> SieveResult<()> {
    fail_point!(name, |parameter: Option<String>| {
        let detail =
            parameter.unwrap_or_else(|| format!("The failpoint '{name}' returned an error"));

        bail!(
            ErrorKind::InjectedFault,
            "An error occurred in a fail point",
            detail = detail
        );
    });

    Ok(())
}
