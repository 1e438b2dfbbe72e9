//! Side-effect lifetimes and the type-erased keys they are stored under.

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle given to a side effect when it starts.
///
/// The lifetime ends when a render pass no longer declares the side
/// effect's key, or when its node is torn down. Cleanup registered through
/// [`Lifetime::on_ended`] runs synchronously at that point, exactly once.
#[derive(Clone)]
pub struct Lifetime {
    inner: Rc<LifetimeInner>,
}

struct LifetimeInner {
    ended: Cell<bool>,
    on_ended: RefCell<Vec<Box<dyn FnOnce()>>>,
    ended_flag: Arc<AtomicBool>,
}

impl Lifetime {
    fn new() -> Self {
        Self {
            inner: Rc::new(LifetimeInner {
                ended: Cell::new(false),
                on_ended: RefCell::new(Vec::new()),
                ended_flag: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Registers cleanup. Runs immediately if the lifetime already ended.
    pub fn on_ended(&self, cleanup: impl FnOnce() + 'static) {
        if self.inner.ended.get() {
            cleanup();
            return;
        }
        self.inner.on_ended.borrow_mut().push(Box::new(cleanup));
    }

    pub fn has_ended(&self) -> bool {
        self.inner.ended.get()
    }

    /// Flag that flips to `true` when the lifetime ends, for background
    /// threads that cannot hold the lifetime itself.
    pub fn ended_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.ended_flag)
    }

    fn end(&self) {
        if self.inner.ended.replace(true) {
            return;
        }
        self.inner.ended_flag.store(true, Ordering::SeqCst);
        let cleanups = std::mem::take(&mut *self.inner.on_ended.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("ended", &self.has_ended())
            .finish()
    }
}

/// Owning side of a [`Lifetime`]; ending is tied to this value.
pub(crate) struct SideEffectLifetime {
    lifetime: Lifetime,
}

impl SideEffectLifetime {
    pub(crate) fn new() -> Self {
        Self {
            lifetime: Lifetime::new(),
        }
    }

    pub(crate) fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    pub(crate) fn end(&self) {
        self.lifetime.end();
    }
}

impl Drop for SideEffectLifetime {
    fn drop(&mut self) {
        self.lifetime.end();
    }
}

trait DynKey {
    fn as_any(&self) -> &dyn Any;
    fn key_eq(&self, other: &dyn DynKey) -> bool;
    fn describe(&self) -> &'static str;
}

impl<K: Hash + Eq + 'static> DynKey for K {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn DynKey) -> bool {
        other.as_any().downcast_ref::<K>() == Some(self)
    }

    fn describe(&self) -> &'static str {
        type_name::<K>()
    }
}

/// Hashable key of any `Hash + Eq` type. Keys of different types never
/// compare equal.
pub(crate) struct AnyKey {
    hash: u64,
    value: Box<dyn DynKey>,
}

impl AnyKey {
    pub(crate) fn new<K: Hash + Eq + 'static>(key: K) -> Self {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<K>().hash(&mut hasher);
        key.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            value: Box::new(key),
        }
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value.key_eq(other.value.as_ref())
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyKey")
            .field("type", &self.value.describe())
            .field("hash", &self.hash)
            .finish()
    }
}
