use std::fmt;
use std::rc::Rc;

use crate::config::{Config, RuntimeConfig};
use crate::debug::{JsonLinesDebugger, WorkflowDebugger};
use crate::observer::{TracingObserver, WorkflowObserver};

/// Everything injected into a host at construction.
#[derive(Clone, Default)]
pub struct HostOptions {
    pub config: RuntimeConfig,
    pub observer: Option<Rc<dyn WorkflowObserver>>,
    pub debugger: Option<Rc<dyn WorkflowDebugger>>,
}

impl HostOptions {
    /// Options derived from a loaded config file.
    ///
    /// `diagnostics.trace_sessions` attaches a [`TracingObserver`];
    /// `diagnostics.debug_snapshots` attaches a [`JsonLinesDebugger`] on stderr.
    pub fn from_config(config: &Config) -> Self {
        let mut options = Self {
            config: config.runtime.clone(),
            ..Self::default()
        };
        if config.diagnostics.trace_sessions {
            options = options.with_observer(TracingObserver);
        }
        if config.diagnostics.debug_snapshots {
            options = options.with_debugger(JsonLinesDebugger::new(std::io::stderr()));
        }
        options
    }

    pub fn render_only_if_state_changed(mut self, enabled: bool) -> Self {
        self.config.render_only_if_state_changed = enabled;
        self
    }

    pub fn with_observer(mut self, observer: impl WorkflowObserver + 'static) -> Self {
        self.observer = Some(Rc::new(observer));
        self
    }

    pub fn with_debugger(mut self, debugger: impl WorkflowDebugger + 'static) -> Self {
        self.debugger = Some(Rc::new(debugger));
        self
    }
}

impl fmt::Debug for HostOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostOptions")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}
