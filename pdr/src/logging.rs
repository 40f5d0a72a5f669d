//! Diagnostic tracing for the simulator.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Diagnostics via `RUST_LOG`, output to stderr.
//!   Retries, empty completions and degraded judgments are reported here.
//!
//! - **Result records (`io/records`)**: Product artifacts under the results
//!   directory. Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset: warnings from the simulator and
/// the analysis binary, errors only from dependencies.
pub const DEFAULT_DIRECTIVES: &str = "error,pdr=warn,pdr_analysis=warn";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVES`].
///
/// # Example
/// ```bash
/// RUST_LOG=pdr=debug pdr run --strategy pdr
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
