//! Tracing setup for applications built on Skirmish.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a global subscriber printing compact events to stderr.
///
/// Verbosity follows `RUST_LOG` (for example
/// `RUST_LOG=skirmish_battle=debug`), falling back to [`DEFAULT_FILTER`].
///
/// # Errors
/// [`SkirmishError::Logging`](crate::SkirmishError::Logging) if a global
/// subscriber is already installed.
pub fn init_tracing() -> Result<(), crate::SkirmishError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}
