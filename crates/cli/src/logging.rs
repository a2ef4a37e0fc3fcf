use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive when `RUST_LOG` is unset. Matches the binary and both
/// library crates (`crisis_panel_engine`, `crisis_panel_io`).
const DEFAULT_FILTER: &str = "crisis_panel=info";

/// Install the stderr subscriber. `log` records from the library crates are
/// forwarded through the `tracing-log` bridge that `init` sets up.
pub fn init_logging(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("crisis_panel=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging initialised");
}
