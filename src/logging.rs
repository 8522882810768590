//! Tracing subscriber setup for the `glow` binary.
//!
//! Three formats: JSON lines for `--json`, pretty output on a terminal and
//! plain compact output when stderr is piped. JSON and compact lines carry
//! thread names so poller, consumer and heartbeat activity can be told
//! apart; pretty output adds them with `-v`.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter used when `RUST_LOG` is unset.
///
/// HTTP client internals stay at `warn` unless asked for explicitly.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "glow=error,reqwest=error";
    }
    match verbose {
        0 => "glow=info,reqwest=warn",
        1 => "glow=debug,reqwest=warn",
        2 => "glow=trace,reqwest=info",
        _ => "glow=trace,reqwest=debug,hyper_util=debug",
    }
}

/// Whether log lines carry the emitting thread's name.
///
/// Only the interactive pretty format hides them, and only without `-v`.
pub const fn shows_thread_names(json: bool, terminal: bool, verbose: u8) -> bool {
    json || !terminal || verbose > 0
}

/// Install the global subscriber.
///
/// * `json` - JSON lines on stderr, for scripts
/// * `verbose` - 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - errors only
///
/// `RUST_LOG` replaces the default filter entirely, e.g.
/// `RUST_LOG=glow::chroma=trace`.
pub fn init_logging(json: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let terminal = io::stderr().is_terminal();
    let thread_names = shows_thread_names(json, terminal, verbose);

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(thread_names)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if terminal {
        let fmt_layer = fmt::layer()
            .with_target(verbose > 0)
            .with_thread_names(thread_names)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_thread_names(thread_names)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
