//! Per-render-pass gate between sinks and the node that owns them.
//!
//! A pipe moves strictly forward through
//! `Preparing → Pending → Valid(handler) → Invalid`:
//!
//! - `Preparing`: created during render; wiring is not complete.
//! - `Pending`: render returned; waiting for the host to publish and re-arm.
//! - `Valid`: events are delivered synchronously to the handler.
//! - `Invalid`: a later render replaced this pipe; events are dropped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) type PipeHandler<E> = Rc<dyn Fn(E)>;

enum PipeState<E> {
    Preparing,
    Pending,
    Valid(PipeHandler<E>),
    Invalid,
}

/// Handler-free view of a pipe's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipePhase {
    Preparing,
    Pending,
    Valid,
    Invalid,
}

pub(crate) struct EventPipe<E> {
    state: RefCell<PipeState<E>>,
    handling: Cell<bool>,
    owner: &'static str,
}

impl<E> EventPipe<E> {
    /// Creates a pipe in the `Preparing` state. `owner` names the workflow
    /// type for diagnostics.
    pub(crate) fn new(owner: &'static str) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(PipeState::Preparing),
            handling: Cell::new(false),
            owner,
        })
    }

    pub(crate) fn phase(&self) -> PipePhase {
        match &*self.state.borrow() {
            PipeState::Preparing => PipePhase::Preparing,
            PipeState::Pending => PipePhase::Pending,
            PipeState::Valid(_) => PipePhase::Valid,
            PipeState::Invalid => PipePhase::Invalid,
        }
    }

    pub(crate) fn set_pending(&self) {
        let phase = self.phase();
        if phase != PipePhase::Preparing {
            panic!(
                "[{}] event pipe set pending from {:?}; only a preparing pipe may become pending",
                self.owner, phase
            );
        }
        *self.state.borrow_mut() = PipeState::Pending;
    }

    pub(crate) fn enable(&self, handler: PipeHandler<E>) {
        let phase = self.phase();
        if phase != PipePhase::Pending {
            panic!(
                "[{}] event pipe enabled from {:?}; only a pending pipe may be enabled",
                self.owner, phase
            );
        }
        *self.state.borrow_mut() = PipeState::Valid(handler);
    }

    pub(crate) fn invalidate(&self) {
        *self.state.borrow_mut() = PipeState::Invalid;
    }

    /// Delivers `event` according to the pipe's state.
    ///
    /// # Panics
    /// Panics while `Preparing` (a sink fired inside render) or `Pending`
    /// (a sink fired before the host re-armed events and bypassed the queue).
    pub(crate) fn handle(&self, event: E) {
        let handler = match &*self.state.borrow() {
            PipeState::Preparing => panic!(
                "[{}] sink sent an event during render; sinks are not valid until render has completed",
                self.owner
            ),
            PipeState::Pending => panic!(
                "[{}] event sent to a pipe that is wired but not yet enabled",
                self.owner
            ),
            PipeState::Valid(handler) => Some(Rc::clone(handler)),
            PipeState::Invalid => None,
        };

        match handler {
            Some(handler) => {
                let was_handling = self.handling.replace(true);
                let _restore = scopeguard::guard((), |_| self.handling.set(was_handling));
                handler(event);
            }
            None if self.handling.get() => {
                tracing::trace!(
                    workflow = self.owner,
                    "reentrant event after invalidation ignored"
                );
            }
            None => {
                tracing::debug!(
                    workflow = self.owner,
                    "event dropped: pipe belongs to a render pass that is no longer current"
                );
            }
        }
    }
}
