//! Workflow state machine primitives.
//!
//! This module provides the traits a feature implements to take part in
//! the render tree, plus the values handed to actions while they apply.
//!
//! # Architecture
//!
//! ```text
//! Sink ──→ Action ──→ State ──→ Rendering
//!   ↑                               │
//!   └───────────────────────────────┘
//! ```
//!
//! - **Workflow**: Stateless description of a state machine (props)
//! - **Action**: The only way state changes; may emit an output upward
//! - **Tracked**: Mutable state reference that records whether it was written

mod action;
mod apply_context;
mod definition;
mod tracked;

pub use action::{AnyAction, WorkflowAction};
pub use apply_context::ApplyContext;
pub use definition::{Never, Workflow};
pub use tracked::Tracked;
