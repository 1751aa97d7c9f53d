//! Grouping and statistics over settled fan-out results.

pub mod grouping;

pub use grouping::*;
