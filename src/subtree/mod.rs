//! Per-node reconciliation of children, sinks and side effects.
//!
//! Every render pass starts from what the previous pass committed. Entries
//! the new pass declares again are carried over in place; entries it does
//! not declare are torn down once the pass returns.
//!
//! # Pass protocol
//!
//! ```text
//! invalidate old pipes ──→ render(context) ──→ commit claimed entries
//!                                                   │
//!        tear down unclaimed ←── pipes → Pending ←──┘
//! ```

mod child;
mod render_context;
mod side_effect;

pub use render_context::RenderContext;
pub use side_effect::Lifetime;

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::debug::{ChildSnapshot, UpdateSource, WorkflowUpdateDebugInfo};
use crate::runtime::RuntimeContext;
use crate::sink::{EventPipe, PipeHandler};
use crate::workflow::{AnyAction, Workflow};
use render_context::{ChildEntry, RenderPass};
use side_effect::{AnyKey, SideEffectLifetime};

/// What a pipe carries into its node: an action to apply, or word that
/// something below changed without producing one.
pub(crate) enum SubtreeOutput<W: Workflow> {
    Update {
        action: AnyAction<W>,
        source: UpdateSource,
        subtree_invalidated: bool,
    },
    ChildDidUpdate {
        debug_info: WorkflowUpdateDebugInfo,
        subtree_invalidated: bool,
    },
}

pub(crate) struct SubtreeManager<W: Workflow> {
    runtime: Rc<RuntimeContext>,
    children: Vec<ChildEntry<W>>,
    side_effects: HashMap<AnyKey, SideEffectLifetime>,
    sinks: HashMap<TypeId, Rc<dyn Any>>,
    event_pipes: Vec<Rc<EventPipe<SubtreeOutput<W>>>>,
}

impl<W: Workflow> SubtreeManager<W> {
    pub(crate) fn new(runtime: Rc<RuntimeContext>) -> Self {
        Self {
            runtime,
            children: Vec::new(),
            side_effects: HashMap::new(),
            sinks: HashMap::new(),
            event_pipes: Vec::new(),
        }
    }

    /// Runs one render pass and reconciles its declarations against the
    /// previous one.
    pub(crate) fn render<R>(&mut self, render: impl FnOnce(&mut RenderContext<'_, W>) -> R) -> R {
        for pipe in self.event_pipes.drain(..) {
            pipe.invalidate();
        }

        let mut pass = RenderPass {
            runtime: Rc::clone(&self.runtime),
            previous_children: self.children.drain(..).collect(),
            children: Vec::new(),
            claimed: HashSet::new(),
            previous_side_effects: std::mem::take(&mut self.side_effects),
            side_effects: HashMap::new(),
            previous_sinks: std::mem::take(&mut self.sinks),
            sinks: HashMap::new(),
            pipes: Vec::new(),
        };

        let rendering = render(&mut RenderContext::new(&mut pass));

        let RenderPass {
            previous_children,
            children,
            previous_side_effects,
            side_effects,
            previous_sinks,
            sinks,
            pipes,
            ..
        } = pass;

        // Pending before teardown: cleanup that fires a sink of this node
        // gets deferred instead of hitting a preparing pipe.
        for pipe in &pipes {
            pipe.set_pending();
        }
        self.children = children;
        self.side_effects = side_effects;
        self.sinks = sinks;
        self.event_pipes = pipes;

        if !previous_sinks.is_empty() {
            tracing::trace!(
                workflow = type_name::<W>(),
                count = previous_sinks.len(),
                "dropping sinks not redeclared"
            );
        }
        drop(previous_sinks);
        for (key, child) in previous_children {
            tracing::trace!(workflow = type_name::<W>(), child = ?key, "tearing down child");
            child.teardown();
        }
        for (_, lifetime) in previous_side_effects {
            lifetime.end();
        }

        rendering
    }

    /// Arms this pass's pipes with `handler`, then the children's.
    pub(crate) fn enable_events(&self, handler: PipeHandler<SubtreeOutput<W>>) {
        for pipe in &self.event_pipes {
            pipe.enable(Rc::clone(&handler));
        }
        for (_, child) in &self.children {
            child.enable_events();
        }
    }

    /// Ends everything this node owns.
    pub(crate) fn teardown(&mut self) {
        for pipe in self.event_pipes.drain(..) {
            pipe.invalidate();
        }
        self.sinks.clear();
        for (_, child) in self.children.drain(..) {
            child.teardown();
        }
        for (_, lifetime) in self.side_effects.drain() {
            lifetime.end();
        }
    }

    pub(crate) fn child_snapshots(&self) -> Vec<ChildSnapshot> {
        self.children
            .iter()
            .map(|(key, child)| ChildSnapshot {
                key: key.key().to_string(),
                snapshot: child.debug_snapshot(),
            })
            .collect()
    }
}
