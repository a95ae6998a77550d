//! SceneContext - Per-Scene Bus and Store
//!
//! Built once by the owning scene and passed by reference to every component.
//! Dropping the context tears down both the bus and the store.

use std::cell::Cell;
use std::rc::Rc;

use tracing::info;

use crate::domain::SceneConfig;
use crate::eventing::EventBus;
use crate::state::{PreferenceStorage, SceneState, Scheduler};

/// Event bus and state store of one scene
pub struct SceneContext {
    bus: EventBus,
    state: SceneState,
    cleaned: Cell<bool>,
}

impl SceneContext {
    pub fn new(
        config: &SceneConfig,
        storage: Box<dyn PreferenceStorage>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let bus = EventBus::new(&config.bus);
        let state = SceneState::new(config.state.clone(), storage, scheduler);
        state.attach_bus(&bus);
        info!("Scene context created");
        Self {
            bus,
            state,
            cleaned: Cell::new(false),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned.get()
    }

    /// Tear down the store and the bus; later calls are no-ops
    ///
    /// Listeners that captured a store or bus handle are released here, which
    /// also breaks the bus/store reference cycle created by `attach_bus`.
    pub fn cleanup(&self) {
        if self.cleaned.replace(true) {
            return;
        }
        self.state.cleanup();
        self.bus.cleanup();
        info!("Scene context cleaned up");
    }
}

impl Drop for SceneContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}
