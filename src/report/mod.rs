//! Report rendering.
//!
//! This module turns a computed report into its Markdown or JSON form.

pub mod generator;

pub use generator::*;
