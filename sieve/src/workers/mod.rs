//! Pipeline units: the source generator and the filter stages.

pub mod base;
pub mod generator;
pub mod stage;
