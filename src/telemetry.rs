//! Tracing subscriber setup.
//!
//! Controlled by `GITLOOM_TRACE`:
//! - unset or empty: no subscriber is installed (events are discarded)
//! - `"stderr"`: JSON events and span closes to stderr
//! - `"pretty"`: human-readable events to stderr
//!
//! The level filter comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable selecting the output mode.
pub const TRACE_ENV: &str = "GITLOOM_TRACE";

/// Where tracing output goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceMode {
    Off,
    Json,
    Pretty,
}

impl TraceMode {
    /// Interpret the value of [`TRACE_ENV`].
    ///
    /// Unknown values fall back to [`TraceMode::Off`] with a warning on
    /// stderr, since no subscriber exists yet to report it.
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Off,
            Some("stderr" | "json") => Self::Json,
            Some("pretty") => Self::Pretty,
            Some(other) => {
                eprintln!("warning: unrecognized {TRACE_ENV}={other:?}; tracing disabled");
                Self::Off
            }
        }
    }
}

/// Install the global subscriber according to `GITLOOM_TRACE`.
///
/// Safe to call once per process; later calls are ignored.
pub fn init() {
    let value = std::env::var(TRACE_ENV).ok();
    init_with(TraceMode::from_env_value(value.as_deref()));
}

/// Install the global subscriber for an explicit mode.
pub fn init_with(mode: TraceMode) {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init: a subscriber may already be set (tests, embedding callers)
    let _ = match mode {
        TraceMode::Off => return,
        TraceMode::Json => tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init(),
        TraceMode::Pretty => tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
}
