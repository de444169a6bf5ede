//! Logging setup
//!
//! Logs always go to stderr so they never interleave with assistant text
//! streamed to stdout. `RUST_LOG` takes precedence over the CLI flags.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "tripplanner=debug"
    } else {
        "tripplanner=info"
    }
}

/// Initialize the global subscriber
///
/// # Arguments
///
/// * `verbose` - Raise the default level to debug
/// * `json` - Emit JSON lines instead of human-readable output
///
/// # Errors
///
/// Returns error if the filter cannot be parsed or a subscriber is
/// already installed
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter(verbose)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}
