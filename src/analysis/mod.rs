//! Score aggregation.
//!
//! This module holds the pure reduction from response rows to report
//! statistics.

pub mod engine;

pub use engine::*;
