use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::core::errors::{PercyError, Result};

/// Install the diagnostic subscriber.
///
/// Events go to stderr so stdout stays clean for `percy resolve`.
/// `verbose` raises the level to `debug` whatever `level` says.
pub fn init(level: &str, verbose: bool) -> Result<()> {
    let directive = if verbose { "debug" } else { level };
    let filter_layer = EnvFilter::try_new(directive).map_err(|e| PercyError::InvalidConfig {
        detail: format!("invalid log level '{level}': {e}"),
    })?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| PercyError::InvalidConfig {
            detail: format!("logging already initialized: {e}"),
        })
}
