//! Concurrency primitives used by the pipeline units.
//!
//! Units never share state directly. They are connected by [`channel`]s with exactly one writer
//! and one reader, report primes through the [`collector`], stop early on the [`shutdown`]
//! signal and are accounted for by the [`tracker`].

pub mod channel;
pub mod collector;
pub mod shutdown;
pub mod tracker;
