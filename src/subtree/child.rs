//! Type-erased children of a node.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::SubtreeOutput;
use crate::debug::{UpdateSource, WorkflowHierarchyDebugSnapshot};
use crate::node::{NodeOutput, WorkflowNode};
use crate::sink::EventPipe;
use crate::workflow::{AnyAction, Workflow};

/// Reconciliation key: the child's static type plus the caller's string key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct ChildKey {
    type_id: TypeId,
    type_name: &'static str,
    key: String,
}

impl ChildKey {
    pub(crate) fn new<C: Workflow>(key: String) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            key,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?}]", self.type_name, self.key)
    }
}

/// Maps a child's output into an action of the parent `P`.
pub(crate) type OutputMap<P, O> = Rc<dyn Fn(O) -> Option<AnyAction<P>>>;

/// Operations the parent's subtree needs on a child of any workflow type.
pub(crate) trait AnyChildWorkflow<P: Workflow> {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn enable_events(&self);

    fn teardown(&self);

    fn debug_snapshot(&self) -> WorkflowHierarchyDebugSnapshot;
}

pub(crate) struct ChildWorkflow<P: Workflow, C: Workflow> {
    node: Rc<WorkflowNode<C>>,
    _parent: PhantomData<fn() -> P>,
}

impl<P: Workflow, C: Workflow> ChildWorkflow<P, C> {
    pub(crate) fn new(node: Rc<WorkflowNode<C>>) -> Self {
        Self {
            node,
            _parent: PhantomData,
        }
    }

    pub(crate) fn node(&self) -> &Rc<WorkflowNode<C>> {
        &self.node
    }

    /// Routes the child's output through `pipe` for the current pass.
    pub(crate) fn rewire(&self, pipe: Rc<EventPipe<SubtreeOutput<P>>>, map: OutputMap<P, C::Output>) {
        self.node.set_on_output(Rc::new(move |output: NodeOutput<C::Output>| {
            let NodeOutput {
                event,
                debug_info,
                subtree_invalidated,
            } = output;

            let forwarded = match event.and_then(|event| map(event)) {
                Some(action) => SubtreeOutput::Update {
                    action,
                    source: UpdateSource::Subtree {
                        child: Box::new(debug_info),
                    },
                    subtree_invalidated,
                },
                None => SubtreeOutput::ChildDidUpdate {
                    debug_info,
                    subtree_invalidated,
                },
            };
            pipe.handle(forwarded);
        }));
    }
}

impl<P: Workflow, C: Workflow> AnyChildWorkflow<P> for ChildWorkflow<P, C> {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn enable_events(&self) {
        self.node.enable_events();
    }

    fn teardown(&self) {
        self.node.teardown();
    }

    fn debug_snapshot(&self) -> WorkflowHierarchyDebugSnapshot {
        self.node.debug_snapshot()
    }
}
