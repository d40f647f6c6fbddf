//! Internal diagnostics
//!
//! The pipeline reports its own failures through `tracing`. Hosts that do not
//! install a subscriber of their own can call [`init_tracing`] to get them on
//! stderr, away from the console mirror on stdout.

/// Initialize tracing output on stderr
///
/// Call early in main() before any logging occurs. `RUST_LOG` overrides the
/// default filter. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose { "chanlog=debug" } else { "chanlog=warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .compact(),
        )
        .try_init();
}
