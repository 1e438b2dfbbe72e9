//! Shared workflows and collectors for integration tests.

#![allow(dead_code, unused_imports)]

use std::cell::RefCell;
use std::rc::Rc;

use workflow_runtime::{
    ApplyContext, Never, RenderContext, Sink, Tracked, Workflow, WorkflowAction,
    WorkflowDebugger, WorkflowHierarchyDebugSnapshot, WorkflowUpdateDebugInfo,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ---------------------------------------------------------------------------
// Counter: a single node with one sink.
// ---------------------------------------------------------------------------

pub struct Counter;

pub enum CounterAction {
    Increment,
    /// Emits the current value without touching state.
    Echo,
}

impl WorkflowAction for CounterAction {
    type Workflow = Counter;

    fn apply(self, state: &mut Tracked<'_, u32>, _context: &ApplyContext<Counter>) -> Option<u32> {
        match self {
            CounterAction::Increment => {
                **state += 1;
                None
            }
            CounterAction::Echo => Some(**state),
        }
    }
}

pub struct CounterScreen {
    pub value: u32,
    pub sink: Sink<CounterAction>,
}

impl Workflow for Counter {
    type State = u32;
    type Rendering = CounterScreen;
    type Output = u32;

    fn make_initial_state(&self) -> u32 {
        0
    }

    fn render(&self, state: &u32, context: &mut RenderContext<'_, Self>) -> CounterScreen {
        CounterScreen {
            value: *state,
            sink: context.make_sink(),
        }
    }
}

// ---------------------------------------------------------------------------
// Roster: keyed children, each with a side effect that logs start and end.
// ---------------------------------------------------------------------------

pub struct Roster {
    pub names: Vec<&'static str>,
    pub log: Log,
}

impl Roster {
    pub fn new(names: &[&'static str], log: &Log) -> Self {
        Self {
            names: names.to_vec(),
            log: Rc::clone(log),
        }
    }
}

impl Workflow for Roster {
    type State = ();
    type Rendering = Vec<MemberScreen>;
    type Output = Never;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) -> Vec<MemberScreen> {
        self.names
            .iter()
            .map(|&name| {
                let member = Member {
                    name,
                    log: Rc::clone(&self.log),
                };
                context.render_child_ignoring_output(member, name)
            })
            .collect()
    }
}

pub struct Member {
    pub name: &'static str,
    pub log: Log,
}

pub enum MemberAction {
    Bump,
}

impl WorkflowAction for MemberAction {
    type Workflow = Member;

    fn apply(self, state: &mut Tracked<'_, u32>, _context: &ApplyContext<Member>) -> Option<Never> {
        match self {
            MemberAction::Bump => **state += 1,
        }
        None
    }
}

pub struct MemberScreen {
    pub name: &'static str,
    pub value: u32,
    pub bump: Sink<MemberAction>,
}

impl Workflow for Member {
    type State = u32;
    type Rendering = MemberScreen;
    type Output = Never;

    fn make_initial_state(&self) -> u32 {
        self.log.borrow_mut().push(format!("init:{}", self.name));
        0
    }

    fn workflow_did_change(&self, _previous: &Self, _state: &mut u32) {
        self.log.borrow_mut().push(format!("changed:{}", self.name));
    }

    fn render(&self, state: &u32, context: &mut RenderContext<'_, Self>) -> MemberScreen {
        let log = Rc::clone(&self.log);
        let name = self.name;
        context.run_side_effect("task", move |lifetime| {
            log.borrow_mut().push(format!("start:{}", name));
            lifetime.on_ended(move || log.borrow_mut().push(format!("end:{}", name)));
        });

        MemberScreen {
            name: self.name,
            value: *state,
            bump: context.make_sink(),
        }
    }
}

// ---------------------------------------------------------------------------
// Toggle: the parent swaps its child key when the child asks it to.
// ---------------------------------------------------------------------------

pub struct ToggleParent;

pub enum ToggleAction {
    Flip,
}

impl WorkflowAction for ToggleAction {
    type Workflow = ToggleParent;

    fn apply(self, state: &mut Tracked<'_, bool>, _context: &ApplyContext<ToggleParent>) -> Option<Never> {
        match self {
            ToggleAction::Flip => **state = !**state,
        }
        None
    }
}

pub struct ToggleScreen {
    pub showing: &'static str,
    pub child: LeafScreen,
}

impl Workflow for ToggleParent {
    type State = bool;
    type Rendering = ToggleScreen;
    type Output = Never;

    fn make_initial_state(&self) -> bool {
        true
    }

    fn render(&self, show_first: &bool, context: &mut RenderContext<'_, Self>) -> ToggleScreen {
        let showing = if *show_first { "first" } else { "second" };
        let child = context.render_child(Leaf, showing, |LeafOutput::ToggleRequested| {
            Some(ToggleAction::Flip)
        });
        ToggleScreen { showing, child }
    }
}

pub struct Leaf;

pub enum LeafOutput {
    ToggleRequested,
}

pub enum LeafAction {
    Press,
    RequestToggle,
}

impl WorkflowAction for LeafAction {
    type Workflow = Leaf;

    fn apply(self, state: &mut Tracked<'_, u32>, _context: &ApplyContext<Leaf>) -> Option<LeafOutput> {
        match self {
            LeafAction::Press => {
                **state += 1;
                None
            }
            LeafAction::RequestToggle => Some(LeafOutput::ToggleRequested),
        }
    }
}

pub struct LeafScreen {
    pub presses: u32,
    pub sink: Sink<LeafAction>,
}

impl Workflow for Leaf {
    type State = u32;
    type Rendering = LeafScreen;
    type Output = LeafOutput;

    fn make_initial_state(&self) -> u32 {
        0
    }

    fn render(&self, state: &u32, context: &mut RenderContext<'_, Self>) -> LeafScreen {
        LeafScreen {
            presses: *state,
            sink: context.make_sink(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Debugger that keeps every snapshot and update it receives.
#[derive(Clone, Default)]
pub struct RecordingDebugger {
    pub initial: Rc<RefCell<Vec<WorkflowHierarchyDebugSnapshot>>>,
    pub updates: Rc<RefCell<Vec<(WorkflowHierarchyDebugSnapshot, WorkflowUpdateDebugInfo)>>>,
}

impl RecordingDebugger {
    pub fn states(&self) -> Vec<String> {
        self.updates
            .borrow()
            .iter()
            .map(|(snapshot, _)| snapshot.state_description.clone())
            .collect()
    }
}

impl WorkflowDebugger for RecordingDebugger {
    fn did_enter_initial_state(&self, snapshot: WorkflowHierarchyDebugSnapshot) {
        self.initial.borrow_mut().push(snapshot);
    }

    fn did_update(&self, snapshot: WorkflowHierarchyDebugSnapshot, update: WorkflowUpdateDebugInfo) {
        self.updates.borrow_mut().push((snapshot, update));
    }
}
