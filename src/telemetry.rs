//! Logging initialization.
//!
//! - `FM_MERGE_LOG` is an `EnvFilter` directive (default `warn`), e.g.
//!   `FM_MERGE_LOG=fmmerge=debug` or `FM_MERGE_LOG=fmmerge::merge=trace`.
//! - `FM_MERGE_LOG_FORMAT=json` switches stderr output to JSON events with
//!   span close records; anything else gives compact text.
//!
//! Logs always go to stderr so that `--output -` JSON stays clean.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Filter directive variable.
pub const LOG_ENV: &str = "FM_MERGE_LOG";
/// Output format variable.
pub const LOG_FORMAT_ENV: &str = "FM_MERGE_LOG_FORMAT";

/// Output format selected by [`LOG_FORMAT_ENV`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line events.
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse the value of [`LOG_FORMAT_ENV`].
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
}
