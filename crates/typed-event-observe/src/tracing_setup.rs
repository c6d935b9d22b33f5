//! Logging for the `tevent` binary.
//!
//! [`init_tracing`] installs a global subscriber described by a
//! [`TracingConfig`] and returns a [`TracingGuard`]. Keep the guard alive
//! for the life of the process; dropping it flushes and shuts down the
//! OpenTelemetry pipeline when one was started.
//!
//! ```no_run
//! use typed_event_observe::tracing_setup::{TracingConfig, init_tracing};
//!
//! let _tracing = init_tracing(&TracingConfig::from_verbosity(1, false)).unwrap();
//! ```
//!
//! Dispatch spans (`dispatch`, with `event` and `subscribers` fields) are
//! emitted at debug level, so `-v` or `RUST_LOG=typed_event_core=debug`
//! shows them.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

const TRACER_NAME: &str = "typed-event";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub directives: String,
    pub format: LogFormat,
    /// Export spans through OpenTelemetry (stdout exporter).
    pub otel: bool,
}

impl TracingConfig {
    /// Filter for the CLI's `-v` count and `--quiet` flag.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let directives = match verbose {
            0 if quiet => "error",
            0 => "warn",
            1 => "info,typed_event_core=debug",
            _ => "trace",
        };
        Self {
            directives: directives.to_string(),
            format: LogFormat::default(),
            otel: false,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_otel(mut self, otel: bool) -> Self {
        self.otel = otel;
        self
    }

    /// `RUST_LOG` when set and valid, otherwise [`TracingConfig::directives`].
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.directives))
    }
}

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Owns the OpenTelemetry provider, if any, and shuts it down on drop.
#[must_use = "dropping the guard shuts down trace export"]
#[derive(Debug, Default)]
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    pub fn exports_spans(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Warning: OTel tracer provider shutdown error: {e}");
            }
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let provider = config.otel.then(|| {
        SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build()
    });

    let text_layer = (config.format == LogFormat::Text).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
    });
    let json_layer = (config.format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
    });
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    if let Some(provider) = &provider {
        opentelemetry::global::set_tracer_provider(provider.clone());
    }
    Ok(TracingGuard { provider })
}
