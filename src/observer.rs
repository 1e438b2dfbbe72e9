//! Lifecycle hooks for external instrumentation.
//!
//! Observers are injected at host construction through `HostOptions`; there
//! is no process-global registration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of one running workflow node, unique within a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a node as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub workflow_type: &'static str,
}

/// Receives node lifecycle events. Every hook defaults to a no-op.
pub trait WorkflowObserver {
    fn session_did_begin(&self, _session: &SessionInfo) {}

    fn session_did_end(&self, _session: &SessionInfo) {}

    fn will_render(&self, _session: &SessionInfo) {}

    fn did_render(&self, _session: &SessionInfo, _elapsed: Duration) {}

    fn workflow_did_change(&self, _session: &SessionInfo) {}

    fn did_apply_action(&self, _session: &SessionInfo, _action: &str, _state_changed: bool) {}
}

/// Observer that reports every hook as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl WorkflowObserver for TracingObserver {
    fn session_did_begin(&self, session: &SessionInfo) {
        tracing::debug!(session = %session.id, workflow = session.workflow_type, "session began");
    }

    fn session_did_end(&self, session: &SessionInfo) {
        tracing::debug!(session = %session.id, workflow = session.workflow_type, "session ended");
    }

    fn will_render(&self, session: &SessionInfo) {
        tracing::trace!(session = %session.id, workflow = session.workflow_type, "render started");
    }

    fn did_render(&self, session: &SessionInfo, elapsed: Duration) {
        tracing::trace!(
            session = %session.id,
            workflow = session.workflow_type,
            elapsed_us = elapsed.as_micros() as u64,
            "render finished"
        );
    }

    fn workflow_did_change(&self, session: &SessionInfo) {
        tracing::debug!(session = %session.id, workflow = session.workflow_type, "props replaced");
    }

    fn did_apply_action(&self, session: &SessionInfo, action: &str, state_changed: bool) {
        tracing::debug!(
            session = %session.id,
            workflow = session.workflow_type,
            action,
            state_changed,
            "action applied"
        );
    }
}
