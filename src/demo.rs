//! Sample workflow tree driven by the demo binary.
//!
//! `Dashboard` renders a `Counter` child and, while enabled, a `Ticker`
//! child whose side effect feeds ticks from a background thread.

use std::fmt;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use workflow_runtime::{
    ApplyContext, Never, RenderContext, Sink, Tracked, Workflow, WorkflowAction,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub ticker_enabled: bool,
    pub interval: Duration,
}

impl Dashboard {
    pub fn new(interval: Duration) -> Self {
        Self {
            ticker_enabled: true,
            interval,
        }
    }
}

#[derive(Debug, Default)]
pub struct DashboardState {
    last_count: u32,
}

pub enum DashboardAction {
    CounterChanged(u32),
}

impl WorkflowAction for DashboardAction {
    type Workflow = Dashboard;

    fn apply(
        self,
        state: &mut Tracked<'_, DashboardState>,
        _context: &ApplyContext<Dashboard>,
    ) -> Option<Never> {
        match self {
            DashboardAction::CounterChanged(value) => state.last_count = value,
        }
        None
    }
}

pub struct DashboardScreen {
    pub counter: CounterScreen,
    pub ticker: Option<TickerScreen>,
    pub last_count: u32,
}

impl fmt::Display for DashboardScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "counter={} (seen by parent: {})", self.counter.value, self.last_count)?;
        match &self.ticker {
            Some(ticker) => write!(f, " ticks={}", ticker.ticks),
            None => write!(f, " ticker=off"),
        }
    }
}

impl Workflow for Dashboard {
    type State = DashboardState;
    type Rendering = DashboardScreen;
    type Output = Never;

    fn make_initial_state(&self) -> DashboardState {
        DashboardState::default()
    }

    fn render(&self, state: &DashboardState, context: &mut RenderContext<'_, Self>) -> DashboardScreen {
        let counter = context.render_child(Counter, "counter", |value| {
            Some(DashboardAction::CounterChanged(value))
        });
        let ticker = if self.ticker_enabled {
            let ticker = Ticker {
                interval: self.interval,
            };
            Some(context.render_child_ignoring_output(ticker, "ticker"))
        } else {
            None
        };

        DashboardScreen {
            counter,
            ticker,
            last_count: state.last_count,
        }
    }
}

/// Counts presses and reports every new value to its parent.
pub struct Counter;

pub enum CounterAction {
    Increment,
}

impl WorkflowAction for CounterAction {
    type Workflow = Counter;

    fn apply(self, state: &mut Tracked<'_, u32>, _context: &ApplyContext<Counter>) -> Option<u32> {
        match self {
            CounterAction::Increment => **state += 1,
        }
        Some(**state)
    }
}

pub struct CounterScreen {
    pub value: u32,
    pub increment: Sink<CounterAction>,
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
            increment: context.make_sink(),
        }
    }
}

/// Counts ticks delivered from a background thread.
pub struct Ticker {
    pub interval: Duration,
}

pub enum TickerAction {
    Tick,
}

impl WorkflowAction for TickerAction {
    type Workflow = Ticker;

    fn apply(self, state: &mut Tracked<'_, u64>, _context: &ApplyContext<Ticker>) -> Option<Never> {
        match self {
            TickerAction::Tick => **state += 1,
        }
        None
    }
}

pub struct TickerScreen {
    pub ticks: u64,
}

impl Workflow for Ticker {
    type State = u64;
    type Rendering = TickerScreen;
    type Output = Never;

    fn make_initial_state(&self) -> u64 {
        0
    }

    fn render(&self, state: &u64, context: &mut RenderContext<'_, Self>) -> TickerScreen {
        let tick = context.make_sink::<TickerAction>();
        let remote = context.remote_sink(&tick);
        let interval = self.interval;

        context.run_side_effect("ticks", move |lifetime| {
            let ended = lifetime.ended_flag();
            thread::spawn(move || {
                while !ended.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    if ended.load(Ordering::SeqCst) || !remote.send(TickerAction::Tick) {
                        break;
                    }
                }
            });
            lifetime.on_ended(|| tracing::info!("ticker stopped"));
        });

        TickerScreen { ticks: *state }
    }
}
