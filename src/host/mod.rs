//! Root driver of a workflow tree.
//!
//! The host owns the root node and the serial execution context. Every
//! event cycle follows the same handshake:
//!
//! ```text
//! action applied ──→ output bubbles to root ──→ render whole tree
//!                                                     │
//!      enable events ←── debugger ←── publish output ←── publish rendering
//! ```
//!
//! Subscribers run while the new pass is wired but not yet enabled, so any
//! sink they fire is queued and applied after the cycle completes.

mod options;
mod publisher;

pub use options::HostOptions;
pub use publisher::Subscription;

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::debug::{UpdateSource, WorkflowDebugger, WorkflowHierarchyDebugSnapshot, WorkflowUpdateDebugInfo};
use crate::node::{NodeOutput, WorkflowNode};
use crate::runtime::RuntimeContext;
use crate::sink::{RemoteMessage, RemoteSink, Sink};
use crate::workflow::Workflow;
use publisher::Publisher;

/// Runs a workflow tree and exposes its renderings and outputs.
pub struct WorkflowHost<W: Workflow> {
    inner: Rc<HostInner<W>>,
}

struct HostInner<W: Workflow> {
    root: Rc<WorkflowNode<W>>,
    runtime: Rc<RuntimeContext>,
    rendering: RefCell<Rc<W::Rendering>>,
    renderings: Publisher<W::Rendering>,
    outputs: Publisher<W::Output>,
    debugger: Option<Rc<dyn WorkflowDebugger>>,
    remote_rx: RefCell<Option<UnboundedReceiver<RemoteMessage>>>,
}

impl<W: Workflow> WorkflowHost<W> {
    pub fn new(workflow: W) -> Self {
        Self::with_options(workflow, HostOptions::default())
    }

    /// Builds the root node, performs the first render and enables events.
    pub fn with_options(workflow: W, options: HostOptions) -> Self {
        let HostOptions {
            config,
            observer,
            debugger,
        } = options;
        let (runtime, remote_rx) = RuntimeContext::new(config, observer);

        let root = WorkflowNode::new(workflow, Rc::clone(&runtime));
        let rendering = Rc::new(root.render());
        root.enable_events();

        let inner = Rc::new(HostInner {
            root,
            runtime,
            rendering: RefCell::new(rendering),
            renderings: Publisher::new(),
            outputs: Publisher::new(),
            debugger,
            remote_rx: RefCell::new(Some(remote_rx)),
        });

        let host = Rc::downgrade(&inner);
        inner.root.set_on_output(Rc::new(move |output| {
            if let Some(host) = host.upgrade() {
                host.handle_output(output);
            }
        }));

        if let Some(debugger) = &inner.debugger {
            debugger.did_enter_initial_state(inner.root.debug_snapshot());
        }
        tracing::debug!(workflow = type_name::<W>(), "workflow host started");

        Self { inner }
    }

    /// The most recently published rendering.
    pub fn rendering(&self) -> Rc<W::Rendering> {
        self.inner.rendering.borrow().clone()
    }

    /// Calls `callback` with every rendering published from now on.
    pub fn on_rendering(&self, callback: impl FnMut(&W::Rendering) + 'static) -> Subscription {
        self.inner.renderings.subscribe(callback)
    }

    /// Calls `callback` with every output the root emits from now on.
    pub fn on_output(&self, callback: impl FnMut(&W::Output) + 'static) -> Subscription {
        self.inner.outputs.subscribe(callback)
    }

    /// Replaces the root workflow value and forces a render pass.
    ///
    /// Called while an event cycle is in flight (from a subscriber, say),
    /// the update is queued behind it.
    pub fn update(&self, workflow: W) {
        let host = Rc::downgrade(&self.inner);
        let task = move || {
            if let Some(host) = host.upgrade() {
                host.apply_update(workflow);
            }
        };

        let runtime = &self.inner.runtime;
        if runtime.is_dispatching() {
            tracing::trace!(workflow = type_name::<W>(), "deferring host update");
            runtime.defer(Box::new(task));
        } else {
            runtime.dispatch(task);
        }
    }

    pub fn debug_snapshot(&self) -> WorkflowHierarchyDebugSnapshot {
        self.inner.root.debug_snapshot()
    }

    /// Wraps `sink` for use from background threads. Values are delivered
    /// by [`drain_remote`](Self::drain_remote) or [`pump`](Self::pump).
    pub fn remote_sink<V: Send + 'static>(&self, sink: &Sink<V>) -> RemoteSink<V> {
        self.inner.runtime.remote_sink(sink)
    }

    /// Delivers every remote value already queued. Returns how many
    /// matched a registered remote sink; a value whose sink was not
    /// redeclared by the latest render still counts, though sending it
    /// changes nothing.
    pub fn drain_remote(&self) -> usize {
        let mut delivered = 0;
        loop {
            let message = match self.inner.remote_rx.borrow_mut().as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            let Some(message) = message else {
                break;
            };
            if self.inner.runtime.handle_remote(message) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Waits for the next remote message and handles it.
    ///
    /// Returns false when no receiver is available (another `pump` is
    /// waiting) or the channel closed. Cancelling the future loses nothing.
    pub async fn pump(&self) -> bool {
        let Some(rx) = self.inner.remote_rx.borrow_mut().take() else {
            return false;
        };
        let slot = &self.inner.remote_rx;
        let mut rx = scopeguard::guard(rx, |rx| {
            *slot.borrow_mut() = Some(rx);
        });

        let message = rx.recv().await;
        drop(rx);

        match message {
            Some(message) => {
                self.inner.runtime.handle_remote(message);
                true
            }
            None => false,
        }
    }
}

impl<W: Workflow> HostInner<W> {
    fn handle_output(&self, output: NodeOutput<W::Output>) {
        let NodeOutput {
            event,
            debug_info,
            subtree_invalidated,
        } = output;

        let should_render =
            subtree_invalidated || !self.runtime.config().render_only_if_state_changed;

        if should_render {
            let rendering = Rc::new(self.root.render());
            *self.rendering.borrow_mut() = Rc::clone(&rendering);
            self.renderings.publish(&rendering);
        } else {
            tracing::debug!(
                workflow = type_name::<W>(),
                origin = debug_info.origin(),
                "render skipped: no state changed"
            );
        }

        if let Some(event) = event {
            self.outputs.publish(&event);
        }

        if let Some(debugger) = &self.debugger {
            debugger.did_update(self.root.debug_snapshot(), debug_info);
        }

        // A skipped render leaves the previous pass's pipes valid.
        if should_render {
            self.root.enable_events();
        }
    }

    fn apply_update(&self, workflow: W) {
        self.root.update(workflow);
        self.handle_output(NodeOutput {
            event: None,
            debug_info: WorkflowUpdateDebugInfo::did_update::<W>(UpdateSource::External),
            subtree_invalidated: true,
        });
    }
}

impl<W: Workflow> Drop for HostInner<W> {
    fn drop(&mut self) {
        self.root.teardown();
        tracing::debug!(workflow = type_name::<W>(), "workflow host torn down");
    }
}

impl<W: Workflow> fmt::Debug for WorkflowHost<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowHost")
            .field("workflow", &type_name::<W>())
            .field("debugger", &self.inner.debugger.is_some())
            .finish()
    }
}
