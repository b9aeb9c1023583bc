use anyhow::{Context, Error};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Installs the global subscriber: a fmt layer on stderr, filtered by `RUST_LOG`
/// (default `info`), plus an OTLP span exporter when an endpoint is configured.
///
/// The returned provider has to be shut down before exit to flush pending spans.
pub fn init() -> Result<Option<SdkTracerProvider>, Error> {
    let provider = if std::env::var_os(OTLP_ENDPOINT_ENV).is_some() {
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .context("Failed to create OTLP exporter")?;
        Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(otlp_exporter)
                .build(),
        )
    } else {
        None
    };

    let telemetry = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("gha-run-archive")));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(telemetry)
        .with(fmt_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(provider)
}

pub fn shutdown(provider: Option<SdkTracerProvider>) {
    if let Some(provider) = provider
        && let Err(e) = provider.shutdown()
    {
        tracing::warn!("Failed to flush traces: {e}");
    }
}
