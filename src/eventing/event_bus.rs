//! EventBus - Scene-scoped publish/subscribe
//!
//! One bus is created per screen and shared (cheap `Rc` clone) by every
//! component of that screen. Dispatch is synchronous and single-threaded:
//!
//! ```text
//! emit → record history → snapshot listeners → call each (priority desc) → drop spent once-listeners
//! ```
//!
//! Invariants:
//! - an event's listener list is never stored empty
//! - listeners run against the list as it was when `emit` started; registrations
//!   and removals made during a dispatch only affect later emissions
//! - a failing listener never stops the remaining listeners, and no listener or
//!   error-handler failure escapes `emit`
//! - no internal borrow is held while user callbacks run

use super::error_record::ErrorRecord;
use super::history::{HistoryEntry, PayloadSnapshot};
use super::listener::{
    insert_sorted, validate_event_name, CallbackIdentity, ErasedCallback, ListenerId,
    ListenerOptions, ListenerResult, ListenerTarget, Registration,
};
use crate::constants::DEBUG_HISTORY_TAIL;
use crate::domain::EventBusConfig;
use crate::error::{BoxError, Error, Result};
use crate::helpers::BoundedDeque;
use hashlink::LinkedHashMap;
use serde::Serialize;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info};

/// Observer for dispatch failures. Its own failures are logged and swallowed.
pub type ErrorHandler = dyn Fn(&ErrorRecord) -> std::result::Result<(), BoxError>;

struct BusInner {
    /// Event name → listeners, priority descending, in first-registration order of events
    listeners: LinkedHashMap<String, Vec<Registration>>,
    history: BoundedDeque<HistoryEntry>,
    error_handlers: Vec<Rc<ErrorHandler>>,
    log_emits: bool,
}

impl BusInner {
    /// Remove the first matching listener, dropping the event when its list empties
    fn remove_first(
        &mut self,
        event: &str,
        predicate: impl Fn(&Registration) -> bool,
    ) -> Option<Registration> {
        let list = self.listeners.get_mut(event)?;
        let index = list.iter().position(predicate)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.listeners.remove(event);
        }
        Some(removed)
    }
}

/// In-process event bus with priorities, once-listeners, bounded history and
/// isolated error reporting
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

/// Handle returned by registration; unsubscribing affects future dispatches only
#[derive(Clone)]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    event: String,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the listener. Returns false if it was already gone or the bus was dropped.
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let removed = inner
            .borrow_mut()
            .remove_first(&self.event, |r| r.id == self.id);
        removed.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

impl From<&Subscription> for ListenerTarget {
    fn from(subscription: &Subscription) -> Self {
        ListenerTarget::Id(subscription.id.clone())
    }
}

/// Listener count of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerCount {
    pub event: String,
    pub count: usize,
}

/// Read-only snapshot for diagnostic tooling
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub event_names: Vec<String>,
    pub listener_counts: Vec<ListenerCount>,
    /// Last entries of the history, oldest first
    pub recent_history: Vec<HistoryEntry>,
    pub total_history: usize,
}

/// Wrap a typed callback so it can be stored next to callbacks of other payload types
fn erase<P: 'static>(
    callback: impl Fn(&P, &str) -> ListenerResult + 'static,
) -> Rc<ErasedCallback> {
    Rc::new(
        move |payload: &dyn Any, event: &str| match payload.downcast_ref::<P>() {
            Some(payload) => callback(payload, event),
            None => Err(Box::new(Error::PayloadType {
                event: event.to_string(),
                expected: type_name::<P>(),
            }) as BoxError),
        },
    )
}

impl EventBus {
    pub fn new(config: &EventBusConfig) -> Self {
        debug!(
            max_history_size = config.max_history_size,
            "Event bus initialized"
        );
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                listeners: LinkedHashMap::new(),
                history: BoundedDeque::new(config.max_history_size),
                error_handlers: Vec::new(),
                log_emits: config.log_emits,
            })),
        }
    }

    // ==================== Registration ====================

    /// Register a listener for payloads of type `P`
    ///
    /// Fails with [`Error::InvalidArgument`] when `event` is not a usable name.
    /// A listener returning `Ok(true)` marks the emission as handled.
    pub fn on<P, F>(&self, event: &str, callback: F, options: ListenerOptions) -> Result<Subscription>
    where
        P: 'static,
        F: Fn(&P, &str) -> ListenerResult + 'static,
    {
        self.register(event, erase::<P>(callback), None, options)
    }

    /// Register a listener that is removed after its first dispatch
    pub fn once<P, F>(&self, event: &str, callback: F) -> Result<Subscription>
    where
        P: 'static,
        F: Fn(&P, &str) -> ListenerResult + 'static,
    {
        self.on(event, callback, ListenerOptions::once())
    }

    /// Register a shared callback whose identity can later be passed to [`off`](Self::off)
    pub fn on_shared<P, F>(
        &self,
        event: &str,
        callback: Rc<F>,
        options: ListenerOptions,
    ) -> Result<Subscription>
    where
        P: 'static,
        F: Fn(&P, &str) -> ListenerResult + ?Sized + 'static,
    {
        let identity = CallbackIdentity::of(&callback);
        let erased = erase::<P>(move |payload, event| callback(payload, event));
        self.register(event, erased, Some(identity), options)
    }

    fn register(
        &self,
        event: &str,
        callback: Rc<ErasedCallback>,
        identity: Option<CallbackIdentity>,
        options: ListenerOptions,
    ) -> Result<Subscription> {
        validate_event_name(event).map_err(|message| Error::InvalidArgument { message })?;

        let id = ListenerId::generate(event);
        let registration = Registration {
            id: id.clone(),
            callback,
            identity,
            once: options.once,
            priority: options.priority,
        };

        {
            let mut inner = self.inner.borrow_mut();
            match inner.listeners.get_mut(event) {
                Some(list) => insert_sorted(list, registration),
                None => {
                    inner.listeners.insert(event.to_string(), vec![registration]);
                }
            }
        }

        debug!(
            event = %event,
            listener = %id,
            priority = options.priority,
            once = options.once,
            "Listener registered"
        );

        Ok(Subscription {
            bus: Rc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        })
    }

    /// Remove the first listener matching an id or a shared callback
    pub fn off(&self, event: &str, target: impl Into<ListenerTarget>) -> bool {
        let target = target.into();
        let removed = self
            .inner
            .borrow_mut()
            .remove_first(event, |r| r.matches(&target));
        removed.is_some()
    }

    /// Register an error observer
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ErrorRecord) -> std::result::Result<(), BoxError> + 'static,
    {
        self.inner.borrow_mut().error_handlers.push(Rc::new(handler));
    }

    /// Remove the listeners of one event, or of every event
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            match event {
                Some(event) => inner.listeners.remove(event).into_iter().collect::<Vec<_>>(),
                None => std::mem::take(&mut inner.listeners)
                    .into_iter()
                    .map(|(_, list)| list)
                    .collect(),
            }
        };
        drop(removed);
    }

    // ==================== Dispatch ====================

    /// Emit a serializable payload
    ///
    /// Returns true when at least one listener reported the event as handled.
    /// Returns false when nobody listens or the pipeline failed (reported as
    /// an EmitError record).
    pub fn emit<P: Serialize + 'static>(&self, event: &str, payload: &P) -> bool {
        self.dispatch(event, payload, PayloadSnapshot::capture(payload))
    }

    /// Emit a payload that has no JSON form; history stores the sentinel
    pub fn emit_opaque<P: 'static>(&self, event: &str, payload: &P) -> bool {
        self.dispatch(event, payload, PayloadSnapshot::Unclonable)
    }

    fn dispatch(&self, event: &str, payload: &dyn Any, snapshot: PayloadSnapshot) -> bool {
        let listeners = match self.prepare(event, &snapshot) {
            Ok(Some(listeners)) => listeners,
            Ok(None) => return false,
            Err(e) => {
                self.report(ErrorRecord::emit(Box::new(e), event));
                return false;
            }
        };

        let mut handled = false;
        for registration in &listeners {
            match (registration.callback)(payload, event) {
                Ok(result) => handled |= result,
                Err(error) => self.report(ErrorRecord::listener(
                    error,
                    event,
                    registration.id.clone(),
                    snapshot.clone(),
                )),
            }
        }

        let spent: Vec<&ListenerId> = listeners
            .iter()
            .filter(|r| r.once)
            .map(|r| &r.id)
            .collect();
        if !spent.is_empty() {
            let removed: Vec<_> = {
                let mut inner = self.inner.borrow_mut();
                spent
                    .into_iter()
                    .filter_map(|id| inner.remove_first(event, |r| &r.id == id))
                    .collect()
            };
            drop(removed);
        }

        handled
    }

    /// Record history and take the dispatch snapshot
    fn prepare(
        &self,
        event: &str,
        snapshot: &PayloadSnapshot,
    ) -> Result<Option<Vec<Registration>>> {
        validate_event_name(event).map_err(|message| Error::InvalidArgument { message })?;

        let mut inner = self.inner.try_borrow_mut()?;
        inner.history.push(HistoryEntry::new(event, snapshot.clone()));

        let Some(list) = inner.listeners.get(event) else {
            return Ok(None);
        };
        if inner.log_emits {
            debug!(event = %event, listeners = list.len(), "Emitting event");
        }
        Ok(Some(list.clone()))
    }

    /// Deliver a record to every error handler
    fn report(&self, record: ErrorRecord) {
        error!(
            kind = %record.kind,
            event = %record.event,
            listener = ?record.listener_id.as_ref().map(ListenerId::as_str),
            error = %record.error,
            "Event dispatch error"
        );

        let handlers = match self.inner.try_borrow() {
            Ok(inner) => inner.error_handlers.clone(),
            Err(_) => return,
        };
        for handler in handlers {
            if let Err(e) = handler(&record) {
                error!(error = %e, event = %record.event, "Error handler failed");
            }
        }
    }

    // ==================== Introspection ====================

    /// Event names with at least one listener, in first-registration order
    pub fn event_names(&self) -> Vec<String> {
        self.inner.borrow().listeners.keys().cloned().collect()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.borrow().listeners.get(event).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Copy of the whole history, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.borrow().history.to_vec()
    }

    /// History entries of one event, oldest first
    pub fn history_for(&self, event: &str) -> Vec<HistoryEntry> {
        self.inner
            .borrow()
            .history
            .iter()
            .filter(|entry| entry.event == event)
            .cloned()
            .collect()
    }

    pub fn debug_info(&self) -> DebugInfo {
        let inner = self.inner.borrow();
        DebugInfo {
            event_names: inner.listeners.keys().cloned().collect(),
            listener_counts: inner
                .listeners
                .iter()
                .map(|(event, list)| ListenerCount {
                    event: event.clone(),
                    count: list.len(),
                })
                .collect(),
            recent_history: inner.history.tail(DEBUG_HISTORY_TAIL).cloned().collect(),
            total_history: inner.history.len(),
        }
    }

    // ==================== Lifecycle ====================

    /// Drop all listeners, history and error handlers
    pub fn cleanup(&self) {
        let (listeners, handlers) = {
            let mut inner = self.inner.borrow_mut();
            inner.history.clear();
            (
                std::mem::take(&mut inner.listeners),
                std::mem::take(&mut inner.error_handlers),
            )
        };
        info!(
            events = listeners.len(),
            error_handlers = handlers.len(),
            "Event bus cleaned up"
        );
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&EventBusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("EventBus")
                .field("events", &inner.listeners.len())
                .field("history", &inner.history.len())
                .field("error_handlers", &inner.error_handlers.len())
                .finish(),
            Err(_) => f.debug_struct("EventBus").finish_non_exhaustive(),
        }
    }
}
