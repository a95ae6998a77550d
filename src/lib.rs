//! Scene Kit Library
//!
//! Component communication for a single UI screen: an [`eventing::EventBus`]
//! for publish/subscribe between components and a [`state::SceneState`]
//! store for shared, observable, partially persisted state.

pub mod app;
pub mod constants;
pub mod domain;
pub mod error;
pub mod eventing;
pub mod helpers;
pub mod state;

pub use app::SceneContext;
pub use error::{Error, Result};
