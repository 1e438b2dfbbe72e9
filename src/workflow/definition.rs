//! Base trait for workflows.

use std::fmt::Debug;

use crate::subtree::RenderContext;

/// Output type for workflows that never emit anything to their parent.
pub type Never = std::convert::Infallible;

/// A state machine definition.
///
/// The value itself is the configuration (props) supplied by the parent
/// on every render. It carries no mutable data: the runtime owns one
/// `State` per rendered instance and only actions may change it.
pub trait Workflow: Sized + 'static {
    /// Mutable data owned by the runtime node for this workflow.
    type State: Debug + 'static;

    /// The value produced by each render pass.
    type Rendering: 'static;

    /// Event type bubbled up to the parent.
    type Output: 'static;

    /// Creates the state for a freshly started instance.
    ///
    /// Called exactly once per node, when the parent first renders this
    /// workflow under a given key.
    fn make_initial_state(&self) -> Self::State;

    /// Called when the parent supplies a replacement configuration for a
    /// running instance, before the new value is committed.
    fn workflow_did_change(&self, _previous: &Self, _state: &mut Self::State) {}

    /// Produces the rendering for the current state.
    ///
    /// Children, sinks and side effects declared through `context` are
    /// reconciled against the previous pass when this returns.
    fn render(&self, state: &Self::State, context: &mut RenderContext<'_, Self>) -> Self::Rendering;
}
