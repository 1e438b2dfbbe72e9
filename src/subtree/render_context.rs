//! The context handed to `Workflow::render`.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use super::child::{AnyChildWorkflow, ChildKey, ChildWorkflow, OutputMap};
use super::side_effect::{AnyKey, Lifetime, SideEffectLifetime};
use super::SubtreeOutput;
use crate::node::WorkflowNode;
use crate::runtime::RuntimeContext;
use crate::sink::{EventPipe, RemoteSink, ReusableSink, Sink};
use crate::workflow::{AnyAction, Workflow, WorkflowAction};

pub(super) type ChildEntry<W> = (ChildKey, Box<dyn AnyChildWorkflow<W>>);

/// Bookkeeping for one render pass of one node.
///
/// `previous_*` holds what the last pass committed and nothing has claimed
/// yet; the plain fields hold what this pass declared.
pub(crate) struct RenderPass<W: Workflow> {
    pub(super) runtime: Rc<RuntimeContext>,
    pub(super) previous_children: HashMap<ChildKey, Box<dyn AnyChildWorkflow<W>>>,
    pub(super) children: Vec<ChildEntry<W>>,
    pub(super) claimed: HashSet<ChildKey>,
    pub(super) previous_side_effects: HashMap<AnyKey, SideEffectLifetime>,
    pub(super) side_effects: HashMap<AnyKey, SideEffectLifetime>,
    pub(super) previous_sinks: HashMap<TypeId, Rc<dyn Any>>,
    pub(super) sinks: HashMap<TypeId, Rc<dyn Any>>,
    pub(super) pipes: Vec<Rc<EventPipe<SubtreeOutput<W>>>>,
}

/// Declares the children, sinks and side effects of one render pass.
///
/// Borrowed for the duration of `Workflow::render` only; everything it
/// hands out that outlives the pass (sinks, lifetimes) is safe to keep.
pub struct RenderContext<'a, W: Workflow> {
    pass: &'a mut RenderPass<W>,
}

impl<'a, W: Workflow> RenderContext<'a, W> {
    pub(super) fn new(pass: &'a mut RenderPass<W>) -> Self {
        Self { pass }
    }

    /// Renders `child` under `key`, mapping its outputs into actions of
    /// this workflow. Returning `None` from `map` reports the output upward
    /// as a plain child update.
    ///
    /// A child rendered under the same type and key as in the previous pass
    /// keeps its node and state; only its workflow value is replaced.
    ///
    /// # Panics
    /// Panics when the same child type and key are rendered twice in one pass.
    pub fn render_child<C, A, F>(&mut self, child: C, key: impl Into<String>, map: F) -> C::Rendering
    where
        C: Workflow,
        A: WorkflowAction<Workflow = W>,
        F: Fn(C::Output) -> Option<A> + 'static,
    {
        let map: OutputMap<W, C::Output> = Rc::new(move |output: C::Output| map(output).map(AnyAction::new));
        self.render_mapped(child, key.into(), map)
    }

    /// Renders `child` under `key` without mapping its outputs.
    pub fn render_child_ignoring_output<C: Workflow>(&mut self, child: C, key: impl Into<String>) -> C::Rendering {
        let ignore: OutputMap<W, C::Output> = Rc::new(|_: C::Output| None);
        self.render_mapped(child, key.into(), ignore)
    }

    fn render_mapped<C: Workflow>(&mut self, child: C, key: String, map: OutputMap<W, C::Output>) -> C::Rendering {
        let child_key = ChildKey::new::<C>(key);
        if !self.pass.claimed.insert(child_key.clone()) {
            panic!(
                "[{}] child {:?} rendered twice in one render pass; keys must be unique per child type",
                type_name::<W>(),
                child_key
            );
        }

        let reused = self
            .pass
            .previous_children
            .remove(&child_key)
            .and_then(|existing| existing.into_any().downcast::<ChildWorkflow<W, C>>().ok());

        let entry = match reused {
            Some(entry) => {
                entry.node().update(child);
                entry
            }
            None => Box::new(ChildWorkflow::new(WorkflowNode::new(
                child,
                Rc::clone(&self.pass.runtime),
            ))),
        };

        let pipe = EventPipe::new(type_name::<W>());
        self.pass.pipes.push(Rc::clone(&pipe));
        entry.rewire(pipe, map);

        let rendering = entry.node().render();
        let entry: Box<dyn AnyChildWorkflow<W>> = entry;
        self.pass.children.push((child_key, entry));
        rendering
    }

    /// Returns a sink that applies actions of type `A` to this node.
    ///
    /// The sink stays usable across passes for as long as every pass
    /// declares a sink of the same action type.
    pub fn make_sink<A: WorkflowAction<Workflow = W>>(&mut self) -> Sink<A> {
        let type_id = TypeId::of::<A>();

        let declared = self
            .pass
            .sinks
            .get(&type_id)
            .cloned()
            .and_then(|router| router.downcast::<ReusableSink<A>>().ok());
        if let Some(router) = declared {
            return router.sink();
        }

        let pipe = EventPipe::new(type_name::<W>());
        self.pass.pipes.push(Rc::clone(&pipe));

        let carried = self
            .pass
            .previous_sinks
            .remove(&type_id)
            .and_then(|router| router.downcast::<ReusableSink<A>>().ok());
        let router = match carried {
            Some(router) => {
                router.replace_pipe(pipe);
                router
            }
            None => ReusableSink::new(pipe, Rc::clone(&self.pass.runtime)),
        };

        let sink = router.sink();
        let router: Rc<dyn Any> = router;
        self.pass.sinks.insert(type_id, router);
        sink
    }

    /// Runs `setup` once for `key`. The side effect stays alive for as long
    /// as following passes declare the same key; its [`Lifetime`] ends on
    /// the first pass that does not.
    ///
    /// A key declared twice in one pass is only honored the first time.
    pub fn run_side_effect<K>(&mut self, key: K, setup: impl FnOnce(&Lifetime))
    where
        K: Hash + Eq + 'static,
    {
        let key = AnyKey::new(key);
        if self.pass.side_effects.contains_key(&key) {
            tracing::trace!(
                workflow = type_name::<W>(),
                ?key,
                "side effect declared twice in one pass; keeping the first"
            );
            return;
        }

        let lifetime = match self.pass.previous_side_effects.remove(&key) {
            Some(running) => running,
            None => {
                let started = SideEffectLifetime::new();
                setup(started.lifetime());
                started
            }
        };
        self.pass.side_effects.insert(key, lifetime);
    }

    /// Wraps `sink` for use from background threads.
    pub fn remote_sink<V: Send + 'static>(&self, sink: &Sink<V>) -> RemoteSink<V> {
        self.pass.runtime.remote_sink(sink)
    }
}

impl<W: Workflow> fmt::Debug for RenderContext<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("workflow", &type_name::<W>())
            .field("children", &self.pass.children.len())
            .field("sinks", &self.pass.sinks.len())
            .field("side_effects", &self.pass.side_effects.len())
            .finish()
    }
}
