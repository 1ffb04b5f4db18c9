//! Logging CLI arguments and tracing filter construction.
use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for the CLI.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags),
    /// e.g. "ghosttype_engine=trace,completion=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// Crate targets that constitute "our" logs.
fn our_crates() -> &'static [&'static str] {
    &[
        "ghosttype",
        "ghosttype_engine",
        "keycast",
        "hookev",
        "screenctx",
        "completion",
    ]
}

/// Build a filter directive string setting the same `level` for all of our
/// crates.
fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    let parts: Vec<String> = our_crates().iter().map(|t| format!("{t}={lvl}")).collect();
    parts.join(",")
}

/// Compute the final filter spec with precedence: explicit filter, then
/// trace/debug/level flags (crate-scoped), then `RUST_LOG`, then
/// crate-scoped `info`.
pub fn compute_spec(args: &LogArgs) -> String {
    if let Some(spec) = &args.log_filter {
        return spec.clone();
    }
    if args.trace {
        return level_spec_for("trace");
    }
    if args.debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = &args.log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}
