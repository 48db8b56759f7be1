//! Observation hooks for arena lifecycle events
//!
//! Observers are invoked synchronously while the arena lock is held; the
//! lock is reentrant, so an observer may query the arena or perform a
//! nested allocation. An observer must not destroy the arena it fires
//! from.

use core::ptr::NonNull;
use std::sync::Arc;

use crate::arena::Arena;

/// Event delivered to an [`ArenaObserver`]
#[derive(Debug, Clone, Copy)]
pub enum ArenaEvent {
    /// A successful allocation of `size` bytes at `ptr`
    Alloc { ptr: NonNull<u8>, size: usize },
    /// The arena was reset to empty
    Reset,
    /// The arena is being destroyed
    Destroy,
}

/// Observer for arena events
pub trait ArenaObserver: Send + Sync {
    /// Handle an arena event
    fn on_event(&self, arena: &Arena, event: &ArenaEvent);
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl ArenaObserver for NoOpObserver {
    fn on_event(&self, _arena: &Arena, _event: &ArenaEvent) {}
}

/// Callback receiving formatted error messages
///
/// Dispatched on every reported error; an observer, not a recovery path.
pub type ErrorSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Dispatch a formatted error message to `sink`, falling back to stderr
pub(crate) fn dispatch_error(sink: Option<&ErrorSink>, message: &str) {
    match sink {
        Some(sink) => sink(message),
        None => eprintln!("{message}"),
    }
}
