//! Render-tree reconciliation runtime for composable workflow state machines.
//!
//! ```text
//! Sink ──→ EventPipe ──→ Node (apply action) ──→ parent ... ──→ Host
//!   ↑                                                            │
//!   └──── enable events ←── publish rendering ←── render tree ←──┘
//! ```
//!
//! A [`Workflow`] describes a state machine. A [`WorkflowHost`] runs a tree
//! of them on one serial execution context: actions mutate state, outputs
//! bubble to the root, the tree re-renders, and the new rendering is
//! published to subscribers.

pub mod config;
pub mod debug;
pub mod host;
pub mod logging;
mod node;
pub mod observer;
mod runtime;
pub mod sink;
pub mod subtree;
pub mod workflow;

pub use debug::{WorkflowDebugger, WorkflowHierarchyDebugSnapshot, WorkflowUpdateDebugInfo};
pub use host::{HostOptions, Subscription, WorkflowHost};
pub use observer::WorkflowObserver;
pub use sink::{RemoteSink, Sink};
pub use subtree::{Lifetime, RenderContext};
pub use workflow::{AnyAction, ApplyContext, Never, Tracked, Workflow, WorkflowAction};
