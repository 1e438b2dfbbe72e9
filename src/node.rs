//! One running instance of a workflow.
//!
//! A node owns the workflow's state and its subtree bookkeeping. Its parent
//! (or the host, for the root) wires an output callback; actions applied
//! here report upward through that callback once all local borrows are
//! released, so ancestors may re-render this node in the same call stack.

use std::any::type_name;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::debug::{WorkflowHierarchyDebugSnapshot, WorkflowUpdateDebugInfo};
use crate::observer::SessionInfo;
use crate::runtime::RuntimeContext;
use crate::sink::PipeHandler;
use crate::subtree::{SubtreeManager, SubtreeOutput};
use crate::workflow::{AnyAction, ApplyContext, Tracked, Workflow, WorkflowAction};

/// What a node reports to its parent after handling an event.
pub(crate) struct NodeOutput<O> {
    pub(crate) event: Option<O>,
    pub(crate) debug_info: WorkflowUpdateDebugInfo,
    pub(crate) subtree_invalidated: bool,
}

pub(crate) type OutputCallback<O> = Rc<dyn Fn(NodeOutput<O>)>;

struct NodeState<W: Workflow> {
    workflow: Rc<W>,
    state: W::State,
    subtree: SubtreeManager<W>,
    events_enabled: bool,
}

pub(crate) struct WorkflowNode<W: Workflow> {
    this: Weak<Self>,
    session: SessionInfo,
    runtime: Rc<RuntimeContext>,
    inner: RefCell<NodeState<W>>,
    on_output: RefCell<Option<OutputCallback<W::Output>>>,
}

impl<W: Workflow> WorkflowNode<W> {
    pub(crate) fn new(workflow: W, runtime: Rc<RuntimeContext>) -> Rc<Self> {
        let session = SessionInfo {
            id: runtime.next_session_id(),
            workflow_type: type_name::<W>(),
        };
        let state = workflow.make_initial_state();
        let subtree = SubtreeManager::new(Rc::clone(&runtime));

        runtime.observe(|observer| observer.session_did_begin(&session));

        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            session,
            runtime,
            inner: RefCell::new(NodeState {
                workflow: Rc::new(workflow),
                state,
                subtree,
                events_enabled: false,
            }),
            on_output: RefCell::new(None),
        })
    }

    pub(crate) fn set_on_output(&self, callback: OutputCallback<W::Output>) {
        *self.on_output.borrow_mut() = Some(callback);
    }

    pub(crate) fn render(&self) -> W::Rendering {
        self.runtime.observe(|observer| observer.will_render(&self.session));
        let started = Instant::now();

        let rendering = {
            let mut inner = self.inner.borrow_mut();
            let NodeState {
                workflow,
                state,
                subtree,
                events_enabled,
            } = &mut *inner;
            *events_enabled = false;
            subtree.render(|context| workflow.render(state, context))
        };

        let elapsed = started.elapsed();
        self.runtime
            .observe(|observer| observer.did_render(&self.session, elapsed));
        rendering
    }

    /// Arms every pipe of the last render pass in this subtree.
    ///
    /// # Panics
    /// Panics when called twice without a render in between.
    pub(crate) fn enable_events(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.events_enabled {
            panic!(
                "[{}] enable_events called twice for the same render pass",
                type_name::<W>()
            );
        }
        inner.events_enabled = true;

        let node = self.this.clone();
        let handler: PipeHandler<SubtreeOutput<W>> = Rc::new(move |output| match node.upgrade() {
            Some(node) => node.handle_subtree_output(output),
            None => tracing::debug!(
                workflow = type_name::<W>(),
                "event dropped: node was torn down"
            ),
        });
        inner.subtree.enable_events(handler);
    }

    /// Replaces the workflow value, keeping state.
    pub(crate) fn update(&self, workflow: W) {
        {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            workflow.workflow_did_change(&inner.workflow, &mut inner.state);
            inner.workflow = Rc::new(workflow);
        }
        self.runtime
            .observe(|observer| observer.workflow_did_change(&self.session));
    }

    fn handle_subtree_output(&self, output: SubtreeOutput<W>) {
        let output = match output {
            SubtreeOutput::Update {
                action,
                source,
                subtree_invalidated,
            } => {
                let (event, state_changed) = self.apply(action);
                NodeOutput {
                    event,
                    debug_info: WorkflowUpdateDebugInfo::did_update::<W>(source),
                    subtree_invalidated: subtree_invalidated || state_changed,
                }
            }
            SubtreeOutput::ChildDidUpdate {
                debug_info,
                subtree_invalidated,
            } => NodeOutput {
                event: None,
                debug_info: WorkflowUpdateDebugInfo::child_did_update::<W>(debug_info),
                subtree_invalidated,
            },
        };

        let on_output = self.on_output.borrow().clone();
        match on_output {
            Some(on_output) => on_output(output),
            None => tracing::debug!(
                workflow = type_name::<W>(),
                "output dropped: node is no longer wired to a parent"
            ),
        }
    }

    /// Applies `action` to the state. Returns the action's output and
    /// whether the state was written.
    fn apply(&self, action: AnyAction<W>) -> (Option<W::Output>, bool) {
        let name = action.name();
        let mut state_changed = false;

        let output = {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            let context = ApplyContext::new(Rc::clone(&inner.workflow));
            let _invalidate = scopeguard::guard(context.clone(), |context| context.invalidate());
            let mut state = Tracked::new(&mut inner.state, &mut state_changed);
            action.apply(&mut state, &context)
        };

        self.runtime
            .observe(|observer| observer.did_apply_action(&self.session, name, state_changed));
        (output, state_changed)
    }

    pub(crate) fn debug_snapshot(&self) -> WorkflowHierarchyDebugSnapshot {
        let inner = self.inner.borrow();
        WorkflowHierarchyDebugSnapshot {
            workflow_type: type_name::<W>().to_string(),
            state_description: format!("{:?}", inner.state),
            children: inner.subtree.child_snapshots(),
        }
    }

    /// Ends the node and everything below it.
    pub(crate) fn teardown(&self) {
        self.on_output.borrow_mut().take();
        self.inner.borrow_mut().subtree.teardown();
        self.runtime
            .observe(|observer| observer.session_did_end(&self.session));
    }
}
