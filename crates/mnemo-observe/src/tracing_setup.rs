//! Tracing subscriber initialization for the memory pipeline.
//!
//! The update, recall, and extraction paths are all instrumented with
//! spans (`memory_update`, `memory_recall`, `flash_extract`, ...) that
//! carry the session id, so a single subscriber here gives per-session
//! visibility across the whole pipeline.
//!
//! # Usage
//!
//! ```no_run
//! // Structured logging only
//! mnemo_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // Plus OpenTelemetry span export to stdout (local development)
//! mnemo_observe::tracing_setup::init_tracing(true).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use std::sync::OnceLock;

/// Filter used when `RUST_LOG` is unset. The pipeline crates log at debug
/// (scheduling decisions, dedup drops); everything else stays at info.
const DEFAULT_FILTER: &str = "info,mnemo_core=debug,mnemo_infra=debug";

/// Keeps the OTel provider alive for [`shutdown_tracing`].
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// The `fmt` layer emits targets and span close events, so every update
/// cycle logs its duration on completion. With `enable_otel` the same
/// spans are additionally exported through a stdout OTel exporter; swap
/// in an OTLP exporter for anything beyond local development.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("mnemo");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    Ok(())
}

/// Flush buffered spans and shut the OTel provider down.
///
/// No-op when OTel was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_reinit_errs() {
        init_tracing(false).unwrap();
        // The global subscriber slot is single-assignment.
        assert!(init_tracing(false).is_err());
        shutdown_tracing();
    }
}
