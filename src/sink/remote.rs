//! Marshaling sink invocations from background threads onto the runtime.
//!
//! Sinks are bound to the host's serial context and are not `Send`. A
//! [`RemoteSink`] is the thread-safe stand-in: it ships values over a tokio
//! channel, and the host delivers them to the registered sink when it drains
//! or pumps its remote queue.

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::Sink;

pub(crate) enum RemoteMessage {
    Deliver { id: u64, value: Box<dyn Any + Send> },
    Release { id: u64 },
}

type Delivery = Rc<dyn Fn(Box<dyn Any + Send>)>;

/// Serial-side table of registered sinks.
pub(crate) struct RemoteRegistry {
    tx: UnboundedSender<RemoteMessage>,
    entries: RefCell<HashMap<u64, Delivery>>,
    next_id: Cell<u64>,
}

impl RemoteRegistry {
    pub(crate) fn new() -> (Self, UnboundedReceiver<RemoteMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Self {
            tx,
            entries: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        };
        (registry, rx)
    }

    pub(crate) fn register<V: Send + 'static>(&self, sink: &Sink<V>) -> RemoteSink<V> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let sink = sink.clone();
        let delivery: Delivery = Rc::new(move |value: Box<dyn Any + Send>| {
            match value.downcast::<V>() {
                Ok(value) => sink.send(*value),
                Err(_) => tracing::warn!(
                    expected = type_name::<V>(),
                    "remote delivery carried a value of the wrong type"
                ),
            }
        });
        self.entries.borrow_mut().insert(id, delivery);

        RemoteSink {
            registration: Arc::new(Registration {
                id,
                tx: self.tx.clone(),
            }),
            _value: PhantomData,
        }
    }

    /// Handles one message on the serial context. Returns true when a value
    /// matched a registration and was handed to its sink.
    pub(crate) fn handle(&self, message: RemoteMessage) -> bool {
        match message {
            RemoteMessage::Deliver { id, value } => {
                // Clone out so the sink may register new remotes while handling.
                let delivery = self.entries.borrow().get(&id).cloned();
                match delivery {
                    Some(delivery) => {
                        tracing::trace!(remote_id = id, "delivering remote value");
                        delivery(value);
                        true
                    }
                    None => {
                        tracing::debug!(remote_id = id, "remote value for released sink dropped");
                        false
                    }
                }
            }
            RemoteMessage::Release { id } => {
                self.entries.borrow_mut().remove(&id);
                false
            }
        }
    }
}

struct Registration {
    id: u64,
    tx: UnboundedSender<RemoteMessage>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = self.tx.send(RemoteMessage::Release { id: self.id });
    }
}

/// Thread-safe handle that forwards values to a sink on the runtime's
/// serial context.
pub struct RemoteSink<V> {
    registration: Arc<Registration>,
    _value: PhantomData<fn(V)>,
}

impl<V: Send + 'static> RemoteSink<V> {
    /// Queues `value` for delivery. Returns false when the host is gone.
    pub fn send(&self, value: V) -> bool {
        self.registration
            .tx
            .send(RemoteMessage::Deliver {
                id: self.registration.id,
                value: Box::new(value),
            })
            .is_ok()
    }
}

impl<V> Clone for RemoteSink<V> {
    fn clone(&self) -> Self {
        Self {
            registration: Arc::clone(&self.registration),
            _value: PhantomData,
        }
    }
}

impl<V> fmt::Debug for RemoteSink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSink")
            .field("id", &self.registration.id)
            .field("value", &type_name::<V>())
            .finish()
    }
}
