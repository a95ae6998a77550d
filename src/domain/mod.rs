//! Domain Models
//!
//! Scene vocabulary and configuration.

pub mod config;
pub mod scene;

pub use config::*;
pub use scene::*;
