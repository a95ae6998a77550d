//! Application Layer
//!
//! Per-scene context and the headless demo scene.

pub mod application;
pub mod context;

pub use context::SceneContext;
