//! Serializable introspection of the running tree.
//!
//! Snapshots and update records are produced for external tooling only;
//! reconciliation never reads them back.

use std::any::type_name;
use std::cell::RefCell;
use std::io::Write;

use serde::{Deserialize, Serialize};

/// Mirror of the node tree at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHierarchyDebugSnapshot {
    pub workflow_type: String,
    pub state_description: String,
    pub children: Vec<ChildSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSnapshot {
    pub key: String,
    pub snapshot: WorkflowHierarchyDebugSnapshot,
}

impl WorkflowHierarchyDebugSnapshot {
    /// Finds a direct child by key.
    pub fn child(&self, key: &str) -> Option<&WorkflowHierarchyDebugSnapshot> {
        self.children
            .iter()
            .find(|child| child.key == key)
            .map(|child| &child.snapshot)
    }
}

/// Path an update took from the node that applied an action up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowUpdateDebugInfo {
    pub workflow_type: String,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateKind {
    /// A descendant changed without producing an action for this node.
    ChildDidUpdate { child: Box<WorkflowUpdateDebugInfo> },
    /// This node applied an action.
    DidUpdate { source: UpdateSource },
}

/// Where an applied action came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateSource {
    /// A sink, or the host's external update entry point.
    External,
    /// A child's output, mapped to an action of this node.
    Subtree { child: Box<WorkflowUpdateDebugInfo> },
}

impl WorkflowUpdateDebugInfo {
    pub(crate) fn did_update<W>(source: UpdateSource) -> Self {
        Self {
            workflow_type: type_name::<W>().to_string(),
            kind: UpdateKind::DidUpdate { source },
        }
    }

    pub(crate) fn child_did_update<W>(child: WorkflowUpdateDebugInfo) -> Self {
        Self {
            workflow_type: type_name::<W>().to_string(),
            kind: UpdateKind::ChildDidUpdate {
                child: Box::new(child),
            },
        }
    }

    /// Type name of the node where the update originated.
    pub fn origin(&self) -> &str {
        match &self.kind {
            UpdateKind::ChildDidUpdate { child } => child.origin(),
            UpdateKind::DidUpdate {
                source: UpdateSource::Subtree { child },
            } => child.origin(),
            UpdateKind::DidUpdate {
                source: UpdateSource::External,
            } => &self.workflow_type,
        }
    }
}

/// Collaborator notified with a fresh snapshot after every event cycle.
pub trait WorkflowDebugger {
    fn did_enter_initial_state(&self, snapshot: WorkflowHierarchyDebugSnapshot);

    fn did_update(&self, snapshot: WorkflowHierarchyDebugSnapshot, update: WorkflowUpdateDebugInfo);
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum DebugRecord<'a> {
    InitialState {
        snapshot: &'a WorkflowHierarchyDebugSnapshot,
    },
    Update {
        snapshot: &'a WorkflowHierarchyDebugSnapshot,
        update: &'a WorkflowUpdateDebugInfo,
    },
}

/// Debugger that writes one JSON object per line.
pub struct JsonLinesDebugger {
    writer: RefCell<Box<dyn Write>>,
}

impl JsonLinesDebugger {
    pub fn new(writer: impl Write + 'static) -> Self {
        Self {
            writer: RefCell::new(Box::new(writer)),
        }
    }

    fn write_record(&self, record: &DebugRecord<'_>) {
        let mut writer = self.writer.borrow_mut();
        let result = serde_json::to_writer(&mut *writer, record)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(writer));
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to write debug record");
        }
    }
}

impl WorkflowDebugger for JsonLinesDebugger {
    fn did_enter_initial_state(&self, snapshot: WorkflowHierarchyDebugSnapshot) {
        self.write_record(&DebugRecord::InitialState {
            snapshot: &snapshot,
        });
    }

    fn did_update(&self, snapshot: WorkflowHierarchyDebugSnapshot, update: WorkflowUpdateDebugInfo) {
        self.write_record(&DebugRecord::Update {
            snapshot: &snapshot,
            update: &update,
        });
    }
}
