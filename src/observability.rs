use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Filter level when `--verbose` is given
const VERBOSE_LEVEL: &str = "info";
/// Filter level otherwise: only warnings reach the terminal
const QUIET_LEVEL: &str = "warn";

/// Initialize logging for one run
///
/// Notices are `info` events, so they only show up with `--verbose`.
pub fn init_observability(verbose: bool) {
    tracing_subscriber::registry()
        .with(create_env_filter(verbose))
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_level(false)
                .with_writer(std::io::stdout),
        )
        .try_init()
        .ok();
}

/// Create an EnvFilter from the verbosity flag, with RUST_LOG taking precedence
fn create_env_filter(verbose: bool) -> EnvFilter {
    let directive = std::env::var("RUST_LOG")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default_directive(verbose).to_string());

    EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!(
            "Failed to parse filter directive: {}. Falling back to default: info",
            directive
        );
        EnvFilter::new(VERBOSE_LEVEL)
    })
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { VERBOSE_LEVEL } else { QUIET_LEVEL }
}
