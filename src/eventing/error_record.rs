//! Dispatch error records delivered to error handlers

use super::history::PayloadSnapshot;
use super::listener::ListenerId;
use crate::error::BoxError;
use chrono::{DateTime, Local};
use std::fmt;

/// Where in the dispatch pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// A listener returned an error
    Listener,
    /// The emit pipeline itself failed
    Emit,
}

impl fmt::Display for DispatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchErrorKind::Listener => f.write_str("ListenerError"),
            DispatchErrorKind::Emit => f.write_str("EmitError"),
        }
    }
}

/// Transient error report; never persisted
#[derive(Debug)]
pub struct ErrorRecord {
    pub kind: DispatchErrorKind,
    pub error: BoxError,
    pub event: String,
    pub listener_id: Option<ListenerId>,
    pub payload: Option<PayloadSnapshot>,
    pub timestamp: DateTime<Local>,
}

impl ErrorRecord {
    pub(crate) fn listener(
        error: BoxError,
        event: &str,
        listener_id: ListenerId,
        payload: PayloadSnapshot,
    ) -> Self {
        Self {
            kind: DispatchErrorKind::Listener,
            error,
            event: event.to_string(),
            listener_id: Some(listener_id),
            payload: Some(payload),
            timestamp: Local::now(),
        }
    }

    pub(crate) fn emit(error: BoxError, event: &str) -> Self {
        Self {
            kind: DispatchErrorKind::Emit,
            error,
            event: event.to_string(),
            listener_id: None,
            payload: None,
            timestamp: Local::now(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on `{}`", self.kind, self.event)?;
        if let Some(id) = &self.listener_id {
            write!(f, " (listener {id})")?;
        }
        write!(f, ": {}", self.error)
    }
}
