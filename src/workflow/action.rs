//! Actions: the only path that mutates workflow state.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use super::apply_context::ApplyContext;
use super::definition::Workflow;
use super::tracked::Tracked;

type StateOf<W> = <W as Workflow>::State;
type OutputOf<W> = <W as Workflow>::Output;

/// A transition applied to the state of one workflow node.
///
/// Actions are sent through sinks (from renderings) or produced by output
/// maps (from children). Applying an action may emit an output to the
/// parent of the node.
pub trait WorkflowAction: 'static {
    /// The workflow whose state this action mutates.
    type Workflow: Workflow;

    /// Applies the action to `state`.
    ///
    /// Writes through `state` mark the node as changed. `context` exposes
    /// the node's props and must not be read after this call returns.
    fn apply(
        self,
        state: &mut Tracked<'_, StateOf<Self::Workflow>>,
        context: &ApplyContext<Self::Workflow>,
    ) -> Option<OutputOf<Self::Workflow>>;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Object-safe form of [`WorkflowAction`] used for type erasure.
trait ErasedAction<W: Workflow> {
    fn apply_boxed(
        self: Box<Self>,
        state: &mut Tracked<'_, StateOf<W>>,
        context: &ApplyContext<W>,
    ) -> Option<OutputOf<W>>;

    fn erased_name(&self) -> &'static str;
}

impl<A: WorkflowAction> ErasedAction<A::Workflow> for A {
    fn apply_boxed(
        self: Box<Self>,
        state: &mut Tracked<'_, StateOf<A::Workflow>>,
        context: &ApplyContext<A::Workflow>,
    ) -> Option<OutputOf<A::Workflow>> {
        (*self).apply(state, context)
    }

    fn erased_name(&self) -> &'static str {
        self.name()
    }
}

/// A type-erased action for workflow `W`.
pub struct AnyAction<W: Workflow> {
    inner: Box<dyn ErasedAction<W>>,
}

impl<W: Workflow> AnyAction<W> {
    /// Erases a concrete action.
    pub fn new<A: WorkflowAction<Workflow = W>>(action: A) -> Self {
        Self {
            inner: Box::new(action),
        }
    }

    /// Builds an action from a closure.
    pub fn from_fn<F>(apply: F) -> Self
    where
        F: FnOnce(&mut Tracked<'_, StateOf<W>>, &ApplyContext<W>) -> Option<OutputOf<W>> + 'static,
    {
        Self::new(FnAction {
            apply,
            _workflow: PhantomData,
        })
    }
}

impl<W: Workflow> WorkflowAction for AnyAction<W> {
    type Workflow = W;

    fn apply(
        self,
        state: &mut Tracked<'_, StateOf<W>>,
        context: &ApplyContext<W>,
    ) -> Option<OutputOf<W>> {
        self.inner.apply_boxed(state, context)
    }

    fn name(&self) -> &'static str {
        self.inner.erased_name()
    }
}

impl<W: Workflow> fmt::Debug for AnyAction<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyAction").field(&self.name()).finish()
    }
}

struct FnAction<W, F> {
    apply: F,
    _workflow: PhantomData<fn() -> W>,
}

impl<W, F> WorkflowAction for FnAction<W, F>
where
    W: Workflow,
    F: FnOnce(&mut Tracked<'_, StateOf<W>>, &ApplyContext<W>) -> Option<OutputOf<W>> + 'static,
{
    type Workflow = W;

    fn apply(
        self,
        state: &mut Tracked<'_, StateOf<W>>,
        context: &ApplyContext<W>,
    ) -> Option<OutputOf<W>> {
        (self.apply)(state, context)
    }

    fn name(&self) -> &'static str {
        "AnyAction::from_fn"
    }
}
