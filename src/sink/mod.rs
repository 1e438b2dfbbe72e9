//! Sinks: capabilities that feed values back into the action pipeline.
//!
//! A render pass hands out [`Sink`]s. Behind each one sits a reusable router
//! keyed by action type on the owning node; every pass that redeclares the
//! same action type swaps a fresh `EventPipe` into the router, so the sink
//! held by UI code stays usable across renders. When a pass stops declaring
//! the type, the router is dropped and the sink silently does nothing.

mod event_pipe;
mod remote;

pub(crate) use event_pipe::{EventPipe, PipeHandler, PipePhase};
pub(crate) use remote::{RemoteMessage, RemoteRegistry};
pub use remote::RemoteSink;

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::debug::UpdateSource;
use crate::runtime::RuntimeContext;
use crate::subtree::SubtreeOutput;
use crate::workflow::{AnyAction, WorkflowAction};

/// Capability that forwards values into the runtime.
///
/// Cheap to clone and safe to retain indefinitely: once the render pass
/// that produced it is gone and nothing redeclared it, sending is a no-op.
pub struct Sink<V> {
    send: Rc<dyn Fn(V)>,
}

impl<V: 'static> Sink<V> {
    pub(crate) fn from_fn(send: impl Fn(V) + 'static) -> Self {
        Self {
            send: Rc::new(send),
        }
    }

    /// Sends a value. Must be called on the runtime's serial context; use a
    /// [`RemoteSink`] from background threads.
    pub fn send(&self, value: V) {
        (self.send)(value)
    }

    /// Derives a sink that maps values before forwarding them here.
    pub fn contramap<U: 'static>(&self, map: impl Fn(U) -> V + 'static) -> Sink<U> {
        let inner = Rc::clone(&self.send);
        Sink::from_fn(move |value| inner(map(value)))
    }
}

impl<V> Clone for Sink<V> {
    fn clone(&self) -> Self {
        Self {
            send: Rc::clone(&self.send),
        }
    }
}

impl<V> fmt::Debug for Sink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sink").field(&type_name::<V>()).finish()
    }
}

type NodePipe<A> = EventPipe<SubtreeOutput<<A as WorkflowAction>::Workflow>>;

/// Router behind every sink of one action type on one node.
pub(crate) struct ReusableSink<A: WorkflowAction> {
    pipe: RefCell<Rc<NodePipe<A>>>,
    runtime: Rc<RuntimeContext>,
    _action: PhantomData<fn(A)>,
}

impl<A: WorkflowAction> ReusableSink<A> {
    pub(crate) fn new(pipe: Rc<NodePipe<A>>, runtime: Rc<RuntimeContext>) -> Rc<Self> {
        Rc::new(Self {
            pipe: RefCell::new(pipe),
            runtime,
            _action: PhantomData,
        })
    }

    /// Routes the next pass's events through `pipe`.
    pub(crate) fn replace_pipe(&self, pipe: Rc<NodePipe<A>>) {
        *self.pipe.borrow_mut() = pipe;
    }

    /// Builds the outward-facing sink. It holds the router weakly.
    pub(crate) fn sink(self: &Rc<Self>) -> Sink<A> {
        let router: Weak<Self> = Rc::downgrade(self);
        Sink::from_fn(move |action: A| match router.upgrade() {
            Some(router) => router.handle(action),
            None => tracing::debug!(
                action = type_name::<A>(),
                "action dropped: sink was not redeclared by the latest render"
            ),
        })
    }

    fn handle(self: &Rc<Self>, action: A) {
        let phase = self.pipe.borrow().phase();
        let must_defer = phase == PipePhase::Pending
            || (phase != PipePhase::Preparing && self.runtime.is_dispatching());

        if must_defer {
            tracing::trace!(
                action = type_name::<A>(),
                ?phase,
                "deferring action until the current update completes"
            );
            let router = Rc::downgrade(self);
            self.runtime.defer(Box::new(move || match router.upgrade() {
                Some(router) => router.deliver(action),
                None => tracing::debug!(
                    action = type_name::<A>(),
                    "queued action dropped: sink was not redeclared"
                ),
            }));
            return;
        }

        let router = Rc::clone(self);
        self.runtime.dispatch(move || router.deliver(action));
    }

    fn deliver(&self, action: A) {
        // Resolve the pipe at delivery time: a queued action goes through
        // whichever pass is current when the queue drains.
        let pipe = Rc::clone(&*self.pipe.borrow());
        pipe.handle(SubtreeOutput::Update {
            action: AnyAction::new(action),
            source: UpdateSource::External,
            subtree_invalidated: false,
        });
    }
}
