//! Login/logout observer registry.
//!
//! Listeners are `Arc` handles; identity is the allocation, so registering the
//! same handle twice yields two registrations and [`ListenerRegistry::off`]
//! removes exactly one of them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::InvalidReason;
use crate::types::Profile;

/// Event names a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Login,
    Logout,
}

/// Why the client dropped its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutCause {
    /// `logout()` was called.
    Requested,
    /// The server reported the session as invalid.
    SessionInvalid(InvalidReason),
}

/// Payload delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Login(Profile),
    Logout(LogoutCause),
}

impl SessionEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Login(_) => EventKind::Login,
            Self::Logout(_) => EventKind::Logout,
        }
    }
}

/// Callback handle. Keep a clone around to unregister it later.
pub type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Mutex<Vec<(EventKind, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn on(&self, kind: EventKind, listener: Listener) {
        self.entries.lock().push((kind, listener));
    }

    /// Removes the first registration of `listener` for `kind`.
    pub(crate) fn off(&self, kind: EventKind, listener: &Listener) -> bool {
        let mut entries = self.entries.lock();
        let found = entries
            .iter()
            .position(|(k, l)| *k == kind && same_listener(l, listener));
        match found {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Calls every listener registered for the event, in registration order.
    ///
    /// The lock is released before any callback runs, so callbacks may
    /// register or remove listeners. A panicking callback is logged and
    /// skipped.
    pub(crate) fn emit(&self, event: &SessionEvent) {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .entries
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in targets {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(event = ?kind, "Session listener panicked");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
