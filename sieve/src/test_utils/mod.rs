//! Utilities shared by the unit and integration tests of the sieve.

#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod pipeline;
pub mod reference;
