//! Change-detecting state reference handed to actions.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Mutable access to a workflow's state that records writes.
///
/// Every mutable dereference marks the state as changed. The runtime uses
/// the flag to decide whether the subtree was invalidated, which in turn
/// lets the host skip render passes for actions that only emit output.
pub struct Tracked<'a, S> {
    state: &'a mut S,
    changed: &'a mut bool,
}

impl<'a, S> Tracked<'a, S> {
    pub(crate) fn new(state: &'a mut S, changed: &'a mut bool) -> Self {
        Self { state, changed }
    }

    /// True once the state was mutably borrowed or explicitly marked.
    pub fn is_changed(&self) -> bool {
        *self.changed
    }

    /// Marks the state as changed without touching it.
    pub fn set_changed(&mut self) {
        *self.changed = true;
    }

    /// Mutable access that does not mark the state as changed.
    ///
    /// Only for writes that cannot affect the rendering (caches, counters
    /// read by nothing but diagnostics).
    pub fn bypass_change_detection(&mut self) -> &mut S {
        self.state
    }
}

impl<S> Deref for Tracked<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.state
    }
}

impl<S> DerefMut for Tracked<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        *self.changed = true;
        self.state
    }
}

impl<S: fmt::Debug> fmt::Debug for Tracked<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("state", &self.state)
            .field("changed", &self.changed)
            .finish()
    }
}
