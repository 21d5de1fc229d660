//! Log and span output for the `rgate` binary.
//!
//! Every relaygate crate logs through `tracing` with structured fields
//! (`secret_id`, `step`, `dedup_key`, `task_id`). This module installs the
//! subscriber that renders them, and optionally mirrors spans to an
//! OpenTelemetry stdout exporter for `rgate serve --otel`.
//!
//! ```no_run
//! // `-v` on the command line maps to this filter
//! relaygate_observe::tracing_setup::init_tracing("info,relaygate=debug", false).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tracer name reported on exported spans.
const TRACER_NAME: &str = "relaygate";

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Pick the filter for this process.
///
/// A non-empty, parseable `RUST_LOG` overrides the verbosity flags.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    resolve_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_filter)
}

fn resolve_filter(rust_log: Option<String>, default_filter: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// Request and rotation spans are logged when they close, with their timing.
/// With `enable_otel` the same spans also go to the OpenTelemetry stdout
/// exporter until [`shutdown_tracing`] flushes it.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(
    default_filter: &str,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(TRACER_NAME);
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush exported spans. Does nothing unless `--otel` was given.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: span exporter shutdown failed: {e}");
        }
    }
}
