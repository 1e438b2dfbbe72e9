mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{
    entries, log, LeafAction, MemberAction, RecordingDebugger, Roster, ToggleParent,
};
use workflow_runtime::debug::{UpdateKind, UpdateSource};
use workflow_runtime::observer::SessionInfo;
use workflow_runtime::{
    ApplyContext, HostOptions, Never, RenderContext, Sink, Tracked, Workflow, WorkflowAction,
    WorkflowHost, WorkflowObserver,
};

#[test]
fn child_state_survives_rerender_with_same_key() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a", "b"], &log));

    host.rendering()[0].bump.send(MemberAction::Bump);
    host.rendering()[0].bump.send(MemberAction::Bump);
    assert_eq!(host.rendering()[0].value, 2);

    host.update(Roster::new(&["a", "b"], &log));

    let screens = host.rendering();
    assert_eq!(screens[0].name, "a");
    assert_eq!(screens[0].value, 2);
    assert_eq!(screens[1].value, 0);

    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "init:a").count(), 1);
    assert_eq!(log.iter().filter(|e| *e == "start:a").count(), 1);
    assert!(log.contains(&"changed:a".to_string()));
    assert!(!log.iter().any(|e| e.starts_with("end:")));
}

#[test]
fn children_render_in_declaration_order() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a", "b"], &log));
    host.update(Roster::new(&["c", "b", "a"], &log));

    let names: Vec<_> = host.rendering().iter().map(|screen| screen.name).collect();
    assert_eq!(names, vec!["c", "b", "a"]);

    let keys: Vec<_> = host
        .debug_snapshot()
        .children
        .iter()
        .map(|child| child.key.clone())
        .collect();
    assert_eq!(keys, vec!["c", "b", "a"]);
}

#[test]
#[should_panic(expected = "rendered twice in one render pass")]
fn duplicate_child_key_panics() {
    let log = log();
    let _host = WorkflowHost::new(Roster::new(&["a", "a"], &log));
}

#[test]
fn removed_child_side_effect_ends_exactly_once() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a", "b"], &log));

    host.update(Roster::new(&["b"], &log));
    assert_eq!(
        entries(&log)
            .iter()
            .filter(|e| *e == "end:a")
            .count(),
        1
    );

    host.update(Roster::new(&["b"], &log));
    host.update(Roster::new(&[], &log));
    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "end:a").count(), 1);
    assert_eq!(log.iter().filter(|e| *e == "end:b").count(), 1);
    assert_eq!(log.iter().filter(|e| *e == "start:b").count(), 1);
}

#[test]
fn readded_child_starts_fresh() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a"], &log));
    host.rendering()[0].bump.send(MemberAction::Bump);

    host.update(Roster::new(&[], &log));
    host.update(Roster::new(&["a"], &log));

    assert_eq!(host.rendering()[0].value, 0);
    assert_eq!(
        entries(&log),
        vec!["init:a", "start:a", "changed:a", "end:a", "init:a", "start:a"]
    );
}

#[test]
fn dropping_host_ends_side_effects() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a", "b"], &log));
    drop(host);

    let log = entries(&log);
    assert!(log.contains(&"end:a".to_string()));
    assert!(log.contains(&"end:b".to_string()));
}

#[test]
fn sink_of_removed_child_is_a_no_op() {
    let log = log();
    let host = WorkflowHost::new(Roster::new(&["a", "b"], &log));
    let stale = host.rendering()[0].bump.clone();

    host.update(Roster::new(&["b"], &log));
    stale.send(MemberAction::Bump);

    host.update(Roster::new(&["a", "b"], &log));
    assert_eq!(host.rendering()[0].value, 0);
}

#[test]
fn toggled_child_ignores_handlers_from_previous_rendering() {
    let debugger = RecordingDebugger::default();
    let host = WorkflowHost::with_options(
        ToggleParent,
        HostOptions::default().with_debugger(debugger.clone()),
    );
    assert_eq!(host.rendering().showing, "first");
    let stale = host.rendering().child.sink.clone();

    stale.send(LeafAction::RequestToggle);
    assert_eq!(host.rendering().showing, "second");

    // The first child is gone; neither action may reach anything.
    stale.send(LeafAction::Press);
    stale.send(LeafAction::RequestToggle);
    assert_eq!(host.rendering().showing, "second");
    assert_eq!(host.rendering().child.presses, 0);

    host.rendering().child.sink.send(LeafAction::Press);
    assert_eq!(host.rendering().child.presses, 1);
    assert_eq!(host.rendering().showing, "second");

    let updates = debugger.updates.borrow();
    assert_eq!(updates.len(), 2);
    let (_, toggle) = &updates[0];
    assert!(toggle.origin().ends_with("Leaf"));
    assert!(matches!(
        &toggle.kind,
        UpdateKind::DidUpdate {
            source: UpdateSource::Subtree { .. }
        }
    ));
    let (_, press) = &updates[1];
    assert!(matches!(&press.kind, UpdateKind::ChildDidUpdate { .. }));
}

// ---------------------------------------------------------------------------
// Sinks that are not redeclared, and sinks used too early.
// ---------------------------------------------------------------------------

struct Gate;

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    opens: u32,
}

enum GateAction {
    Open,
}

impl WorkflowAction for GateAction {
    type Workflow = Gate;

    fn apply(self, state: &mut Tracked<'_, GateState>, _context: &ApplyContext<Gate>) -> Option<Never> {
        match self {
            GateAction::Open => {
                state.open = true;
                state.opens += 1;
            }
        }
        None
    }
}

impl Workflow for Gate {
    type State = GateState;
    type Rendering = (u32, Option<Sink<GateAction>>);
    type Output = Never;

    fn make_initial_state(&self) -> GateState {
        GateState::default()
    }

    fn render(&self, state: &GateState, context: &mut RenderContext<'_, Self>) -> Self::Rendering {
        let open = (!state.open).then(|| context.make_sink());
        (state.opens, open)
    }
}

#[test]
fn sink_not_redeclared_is_a_no_op() {
    let host = WorkflowHost::new(Gate);
    let open = host.rendering().1.clone();
    let Some(open) = open else {
        panic!("closed gate must render an open sink");
    };

    open.send(GateAction::Open);
    assert_eq!(host.rendering().0, 1);
    assert!(host.rendering().1.is_none());

    open.send(GateAction::Open);
    assert_eq!(host.rendering().0, 1);
}

struct Eager;

enum EagerAction {
    Poke,
}

impl WorkflowAction for EagerAction {
    type Workflow = Eager;

    fn apply(self, _state: &mut Tracked<'_, ()>, _context: &ApplyContext<Eager>) -> Option<Never> {
        None
    }
}

impl Workflow for Eager {
    type State = ();
    type Rendering = ();
    type Output = Never;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) {
        let sink = context.make_sink::<EagerAction>();
        sink.send(EagerAction::Poke);
    }
}

#[test]
#[should_panic(expected = "sinks are not valid until render has completed")]
fn sink_used_during_render_panics() {
    let _host = WorkflowHost::new(Eager);
}

// ---------------------------------------------------------------------------
// Side effects and props.
// ---------------------------------------------------------------------------

struct Effects {
    keys: Vec<u32>,
    log: common::Log,
}

impl Workflow for Effects {
    type State = ();
    type Rendering = ();
    type Output = Never;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) {
        for key in &self.keys {
            let log = Rc::clone(&self.log);
            let key = *key;
            context.run_side_effect(key, move |lifetime| {
                log.borrow_mut().push(format!("start:{}", key));
                lifetime.on_ended(move || log.borrow_mut().push(format!("end:{}", key)));
            });
        }
    }
}

#[test]
fn side_effects_run_once_per_key() {
    let log = log();
    let host = WorkflowHost::new(Effects {
        keys: vec![1, 2, 2],
        log: Rc::clone(&log),
    });
    assert_eq!(entries(&log), vec!["start:1", "start:2"]);

    host.update(Effects {
        keys: vec![2, 3],
        log: Rc::clone(&log),
    });
    assert_eq!(
        entries(&log),
        vec!["start:1", "start:2", "start:3", "end:1"]
    );
}

struct Labeled {
    label: &'static str,
}

enum LabelAction {
    Capture,
    Escape(Rc<RefCell<Option<ApplyContext<Labeled>>>>),
}

impl WorkflowAction for LabelAction {
    type Workflow = Labeled;

    fn apply(
        self,
        state: &mut Tracked<'_, Vec<&'static str>>,
        context: &ApplyContext<Labeled>,
    ) -> Option<Never> {
        match self {
            LabelAction::Capture => {
                let label = context.props().label;
                state.push(label);
            }
            LabelAction::Escape(slot) => {
                *slot.borrow_mut() = Some(context.clone());
            }
        }
        None
    }
}

impl Workflow for Labeled {
    type State = Vec<&'static str>;
    type Rendering = (Vec<&'static str>, Sink<LabelAction>);
    type Output = Never;

    fn make_initial_state(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn render(&self, state: &Vec<&'static str>, context: &mut RenderContext<'_, Self>) -> Self::Rendering {
        (state.clone(), context.make_sink())
    }
}

#[test]
fn apply_context_reads_current_props() {
    let host = WorkflowHost::new(Labeled { label: "one" });
    host.rendering().1.send(LabelAction::Capture);
    host.update(Labeled { label: "two" });
    host.rendering().1.send(LabelAction::Capture);

    assert_eq!(host.rendering().0, vec!["one", "two"]);
}

#[test]
#[should_panic(expected = "ApplyContext read after its action finished applying")]
fn apply_context_read_after_apply_panics() {
    let host = WorkflowHost::new(Labeled { label: "one" });
    let slot = Rc::new(RefCell::new(None));
    host.rendering().1.send(LabelAction::Escape(Rc::clone(&slot)));

    let escaped = slot.borrow_mut().take();
    if let Some(context) = escaped {
        context.props();
    }
}

// ---------------------------------------------------------------------------
// Observer hooks.
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SessionLog(Rc<RefCell<Vec<String>>>);

impl WorkflowObserver for SessionLog {
    fn session_did_begin(&self, session: &SessionInfo) {
        self.0
            .borrow_mut()
            .push(format!("begin:{}", short_name(session)));
    }

    fn session_did_end(&self, session: &SessionInfo) {
        self.0.borrow_mut().push(format!("end:{}", short_name(session)));
    }

    fn did_apply_action(&self, session: &SessionInfo, _action: &str, state_changed: bool) {
        self.0
            .borrow_mut()
            .push(format!("apply:{}:{}", short_name(session), state_changed));
    }
}

fn short_name(session: &SessionInfo) -> &'static str {
    session
        .workflow_type
        .rsplit("::")
        .next()
        .unwrap_or(session.workflow_type)
}

#[test]
fn observer_sees_session_lifecycle() {
    let observer = SessionLog::default();
    let host = WorkflowHost::with_options(
        ToggleParent,
        HostOptions::default().with_observer(observer.clone()),
    );
    host.rendering().child.sink.send(LeafAction::RequestToggle);
    drop(host);

    assert_eq!(
        *observer.0.borrow(),
        vec![
            "begin:ToggleParent",
            "begin:Leaf",
            "apply:Leaf:false",
            "apply:ToggleParent:true",
            "begin:Leaf",
            "end:Leaf",
            "end:Leaf",
            "end:ToggleParent",
        ]
    );
}

// ---------------------------------------------------------------------------
// Cleanup that reports back to the parent while the child is torn down.
// ---------------------------------------------------------------------------

struct Supervisor {
    show_worker: bool,
}

enum SupervisorAction {
    WorkerEnded,
}

impl WorkflowAction for SupervisorAction {
    type Workflow = Supervisor;

    fn apply(self, state: &mut Tracked<'_, u32>, _context: &ApplyContext<Supervisor>) -> Option<Never> {
        match self {
            SupervisorAction::WorkerEnded => **state += 1,
        }
        None
    }
}

impl Workflow for Supervisor {
    type State = u32;
    /// Ended workers, and whether a worker is rendered.
    type Rendering = (u32, bool);
    type Output = Never;

    fn make_initial_state(&self) -> u32 {
        0
    }

    fn render(&self, ended: &u32, context: &mut RenderContext<'_, Self>) -> (u32, bool) {
        // Declared on every pass so the worker's cleanup still has a target.
        let done = context.make_sink::<SupervisorAction>();
        if self.show_worker {
            context.render_child_ignoring_output(Worker { done }, "worker");
        }
        (*ended, self.show_worker)
    }
}

struct Worker {
    done: Sink<SupervisorAction>,
}

impl Workflow for Worker {
    type State = ();
    type Rendering = ();
    type Output = Never;

    fn make_initial_state(&self) {}

    fn render(&self, _state: &(), context: &mut RenderContext<'_, Self>) {
        let done = self.done.clone();
        context.run_side_effect("job", move |lifetime| {
            lifetime.on_ended(move || done.send(SupervisorAction::WorkerEnded));
        });
    }
}

#[test]
fn child_cleanup_can_send_to_parent_during_teardown() {
    let host = WorkflowHost::new(Supervisor { show_worker: true });
    assert_eq!(*host.rendering(), (0, true));

    host.update(Supervisor { show_worker: false });

    assert_eq!(*host.rendering(), (1, false));
    assert!(host.debug_snapshot().child("worker").is_none());

    host.update(Supervisor { show_worker: false });
    assert_eq!(host.rendering().0, 1);
}
