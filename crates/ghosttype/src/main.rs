//! Binary entrypoint for the ghosttype daemon.
//!
//! Wires the global keyboard hook, the suggestion engine, the synthetic
//! injector, and the completion provider together, then waits for Ctrl-C
//! and reports session statistics.
use std::{process, sync::Arc, thread, time::Duration};

use clap::Parser;
use completion::GeminiClient;
use ghosttype_engine::{Engine, EngineConfig};
use keycast::Injector;
use screenctx::DesktopContext;
use tracing::{error, info};
use tracing_subscriber::fmt;

mod logs;

/// Environment variable holding the completion API credential.
const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Delay between consecutive synthetic key events.
const INJECT_PACE: Duration = Duration::from_millis(5);

#[derive(Parser, Debug)]
#[command(name = "ghosttype", about = "System-wide inline AI text completion", version)]
struct Cli {
    /// Completion model to use
    #[arg(long, default_value = completion::DEFAULT_MODEL)]
    model: String,

    /// Typing pause, in milliseconds, before a completion is attempted
    #[arg(long, default_value_t = 700)]
    pause_ms: u64,

    /// Logging controls
    #[command(flatten)]
    log: logs::LogArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let spec = logs::compute_spec(&cli.log);
    fmt()
        .with_env_filter(logs::env_filter_from_spec(&spec))
        .init();

    // Missing credential is a startup error, not a runtime concern.
    let api_key = match std::env::var(API_KEY_VAR) {
        Ok(k) if !k.is_empty() => k,
        _ => {
            error!("{API_KEY_VAR} environment variable not set");
            process::exit(1);
        }
    };

    let injector = match Injector::with_os_sink(INJECT_PACE) {
        Ok(inj) => Arc::new(inj),
        Err(e) => {
            error!(error = %e, "failed to open input synthesizer");
            process::exit(1);
        }
    };

    let cfg = EngineConfig {
        pause: Duration::from_millis(cli.pause_ms),
        ..EngineConfig::default()
    };
    let (engine, handle) = Engine::new(
        cfg,
        injector,
        Arc::new(DesktopContext::new()),
        Arc::new(GeminiClient::new(api_key, cli.model)),
    );
    let engine_task = tokio::spawn(engine.run());

    // The hook delivers every keystroke on this dedicated thread; the
    // handle drops events while the injector's guard is set and enqueues
    // the rest, so the callback never blocks on engine work.
    let hook_handle = handle.clone();
    thread::spawn(move || {
        if let Err(e) = hookev::listen(move |ev| hook_handle.on_hook_event(ev)) {
            error!(error = %e, "global keyboard hook failed");
            process::exit(1);
        }
    });

    info!("ghosttype is active: type and pause for suggestions");
    info!("Tab accepts, Esc rejects, Ctrl+L clears context, Ctrl+C quits");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to wait for shutdown signal");
    }
    info!("shutting down");
    handle.shutdown();

    let stats = match engine_task.await {
        Ok(s) => s,
        Err(_) => handle.stats(),
    };
    info!(
        inputs = stats.total_inputs,
        completions = stats.suggestions_shown,
        "session stats"
    );
    // The hook thread blocks in the OS loop and cannot be joined.
    process::exit(0);
}
