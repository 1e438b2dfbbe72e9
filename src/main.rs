//! Headless harness that runs the sample dashboard tree.

mod demo;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use workflow_runtime::config::Config;
use workflow_runtime::debug::JsonLinesDebugger;
use workflow_runtime::logging::init_tracing;
use workflow_runtime::{HostOptions, WorkflowHost};

use demo::{CounterAction, Dashboard, DashboardScreen};

#[derive(Parser, Debug)]
#[command(name = "workflow-demo")]
#[command(about = "Drive a sample workflow tree without a UI")]
struct Args {
    /// Config file (TOML). Defaults to the user config path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to wait for before switching the ticker off
    #[arg(long, default_value_t = 5)]
    ticks: u64,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,

    /// Skip render passes for actions that change no state
    #[arg(long)]
    skip_unchanged: bool,

    /// Write JSON debug records to stderr
    #[arg(long)]
    debug_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(config.diagnostics.log_filter.as_deref());

    let mut options = HostOptions::from_config(&config);
    if args.skip_unchanged {
        options = options.render_only_if_state_changed(true);
    }
    if args.debug_json {
        options = options.with_debugger(JsonLinesDebugger::new(std::io::stderr()));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(run(&args, options))
}

async fn run(args: &Args, options: HostOptions) -> Result<()> {
    let interval = Duration::from_millis(args.interval_ms);
    let host = WorkflowHost::with_options(Dashboard::new(interval), options);

    println!("{}", host.rendering());
    host.on_rendering(|screen: &DashboardScreen| println!("{}", screen))
        .detach();

    let increment = host.rendering().counter.increment.clone();
    increment.send(CounterAction::Increment);
    increment.send(CounterAction::Increment);

    let wait = interval * 20;
    while ticks(&host.rendering()) < args.ticks {
        match tokio::time::timeout(wait, host.pump()).await {
            Ok(true) => {}
            Ok(false) => bail!("remote channel closed before {} ticks", args.ticks),
            Err(_) => bail!("no tick within {:?}", wait),
        }
    }

    host.update(Dashboard {
        ticker_enabled: false,
        interval,
    });

    let snapshot = serde_json::to_string_pretty(&host.debug_snapshot())?;
    println!("{}", snapshot);
    Ok(())
}

fn ticks(screen: &DashboardScreen) -> u64 {
    screen.ticker.as_ref().map_or(0, |ticker| ticker.ticks)
}
