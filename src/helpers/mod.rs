//! Helper Utilities
//!
//! Common utilities used across the crate.

mod bounded;
mod fs;

pub use bounded::*;
pub use fs::*;
