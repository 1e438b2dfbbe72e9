//! The serial execution context shared by every node under one host.
//!
//! All state reads and writes, action applications and render passes run
//! here, one event cycle at a time. An event that arrives while a cycle is
//! in flight (from a rendering subscriber, an output subscriber, an action
//! body) is deferred onto a FIFO queue and processed after the outermost
//! cycle unwinds.

mod queue;

use std::cell::Cell;
use std::rc::Rc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::RuntimeConfig;
use crate::observer::{SessionId, WorkflowObserver};
use crate::sink::{RemoteMessage, RemoteRegistry, RemoteSink, Sink};
use queue::{ExecutionQueue, Task};

pub(crate) struct RuntimeContext {
    config: RuntimeConfig,
    observer: Option<Rc<dyn WorkflowObserver>>,
    queue: ExecutionQueue,
    dispatching: Cell<bool>,
    next_session: Cell<u64>,
    remote: RemoteRegistry,
}

impl RuntimeContext {
    pub(crate) fn new(
        config: RuntimeConfig,
        observer: Option<Rc<dyn WorkflowObserver>>,
    ) -> (Rc<Self>, UnboundedReceiver<RemoteMessage>) {
        let (remote, rx) = RemoteRegistry::new();
        let context = Rc::new(Self {
            config,
            observer,
            queue: ExecutionQueue::default(),
            dispatching: Cell::new(false),
            next_session: Cell::new(0),
            remote,
        });
        (context, rx)
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Runs `notify` against the attached observer, if any.
    pub(crate) fn observe(&self, notify: impl FnOnce(&dyn WorkflowObserver)) {
        if let Some(observer) = &self.observer {
            notify(observer.as_ref());
        }
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        let id = self.next_session.get();
        self.next_session.set(id + 1);
        SessionId::new(id)
    }

    /// True while an event cycle is being processed.
    pub(crate) fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Queues `task` to run after the current cycle completes.
    pub(crate) fn defer(&self, task: Task) {
        self.queue.push(task);
    }

    /// Runs `task` as an event cycle. The outermost cycle drains deferred
    /// work before returning.
    pub(crate) fn dispatch(&self, task: impl FnOnce()) {
        let outermost = !self.dispatching.replace(true);
        {
            let _reset = scopeguard::guard((), |_| {
                if outermost {
                    self.dispatching.set(false);
                }
            });
            task();
        }
        if outermost {
            self.drain();
        }
    }

    fn drain(&self) {
        while let Some(task) = self.queue.pop() {
            self.dispatching.set(true);
            let _reset = scopeguard::guard((), |_| self.dispatching.set(false));
            task();
        }
    }

    pub(crate) fn remote_sink<V: Send + 'static>(&self, sink: &Sink<V>) -> RemoteSink<V> {
        self.remote.register(sink)
    }

    /// Handles one message from a background thread. Sink sends inside
    /// follow the usual dispatch rules.
    pub(crate) fn handle_remote(&self, message: RemoteMessage) -> bool {
        self.remote.handle(message)
    }
}
