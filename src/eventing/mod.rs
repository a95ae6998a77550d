//! Eventing - Component Event Bus
//!
//! Publish/subscribe between the components of one screen.
//!
//! ```text
//! Component → emit(event, payload) → EventBus → listeners (priority desc)
//!                                         ↘ error handlers (ListenerError / EmitError)
//! ```

mod error_record;
mod event_bus;
mod history;
mod listener;
pub mod scene_event;

pub use error_record::{DispatchErrorKind, ErrorRecord};
pub use event_bus::{DebugInfo, ErrorHandler, EventBus, ListenerCount, Subscription};
pub use history::{HistoryEntry, PayloadSnapshot};
pub use listener::{CallbackIdentity, ListenerId, ListenerOptions, ListenerResult, ListenerTarget};
