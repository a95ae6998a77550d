//! Listener registration types

use crate::error::BoxError;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Result returned by a listener: `Ok(true)` marks the emission as handled
pub type ListenerResult = std::result::Result<bool, BoxError>;

/// Type-erased callback stored in the registry
pub(crate) type ErasedCallback = dyn Fn(&dyn Any, &str) -> ListenerResult;

/// Unique listener id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ListenerId(String);

impl ListenerId {
    pub(crate) fn generate(event: &str) -> Self {
        Self(format!("{event}_{}", uuid::Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration options for [`EventBus::on`](super::EventBus::on)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove the listener after its first dispatch
    pub once: bool,
    /// Higher priorities run first
    pub priority: i32,
}

impl ListenerOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

/// Pointer identity of a shared callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackIdentity(usize);

impl CallbackIdentity {
    pub fn of<F: ?Sized>(callback: &Rc<F>) -> Self {
        Self(Rc::as_ptr(callback) as *const () as usize)
    }
}

/// What [`EventBus::off`](super::EventBus::off) should remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerTarget {
    Id(ListenerId),
    Callback(CallbackIdentity),
}

impl ListenerTarget {
    /// Match a callback registered through `on_shared`
    pub fn callback<F: ?Sized>(callback: &Rc<F>) -> Self {
        ListenerTarget::Callback(CallbackIdentity::of(callback))
    }
}

impl From<ListenerId> for ListenerTarget {
    fn from(id: ListenerId) -> Self {
        ListenerTarget::Id(id)
    }
}

impl From<&ListenerId> for ListenerTarget {
    fn from(id: &ListenerId) -> Self {
        ListenerTarget::Id(id.clone())
    }
}

/// One registered listener
#[derive(Clone)]
pub(crate) struct Registration {
    pub id: ListenerId,
    pub callback: Rc<ErasedCallback>,
    pub identity: Option<CallbackIdentity>,
    pub once: bool,
    pub priority: i32,
}

impl Registration {
    pub fn matches(&self, target: &ListenerTarget) -> bool {
        match target {
            ListenerTarget::Id(id) => &self.id == id,
            ListenerTarget::Callback(identity) => self.identity.as_ref() == Some(identity),
        }
    }
}

/// Insert keeping the list sorted by priority descending; equal priorities
/// keep registration order.
pub(crate) fn insert_sorted(list: &mut Vec<Registration>, registration: Registration) {
    let at = list.partition_point(|r| r.priority >= registration.priority);
    list.insert(at, registration);
}

/// Validate an event name used for registration or emission
pub(crate) fn validate_event_name(event: &str) -> std::result::Result<(), String> {
    if event.trim().is_empty() {
        return Err("event name must not be empty".to_string());
    }
    if event.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("event name `{event}` must not contain whitespace"));
    }
    Ok(())
}
