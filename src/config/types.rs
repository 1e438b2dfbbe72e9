use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Render policy of a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Skip the render pass when an action changed no state anywhere in the
    /// tree (default: false). Output is still published.
    #[serde(default)]
    pub render_only_if_state_changed: bool,
}

/// Diagnostics wiring for hosts and binaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Attach a tracing-backed observer to every host (default: false).
    #[serde(default)]
    pub trace_sessions: bool,
    /// Emit a JSON hierarchy snapshot after every update (default: false).
    #[serde(default)]
    pub debug_snapshots: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset (e.g. "workflow_runtime=debug").
    #[serde(default)]
    pub log_filter: Option<String>,
}
