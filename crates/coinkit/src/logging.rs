//! Tracing subscriber setup for applications embedding the pipeline.
//!
//! Drivers only emit `tracing` events; nothing is printed until a subscriber
//! is installed. Output goes to stderr.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for local runs.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON, anything else pretty output.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `default_level` when set, e.g.
/// `RUST_LOG=chain_btc=debug,chain_eth=info`. Fails if a global subscriber is
/// already installed.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()?,
    }

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
