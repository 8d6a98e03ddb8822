//! Tracing subscriber and OpenTelemetry setup.

use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{Config, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE: &str = "piageon-runner";
const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const SERVICE_NAME_ENV: &str = "OTEL_SERVICE_NAME";

/// Install the global subscriber. Spans are exported over OTLP/gRPC when an
/// endpoint is configured, from `OTEL_EXPORTER_OTLP_ENDPOINT` first and
/// `otel_endpoint` second; otherwise tracing stays local.
///
/// Must run inside a tokio runtime: the batch exporter spawns onto it.
pub fn init_telemetry(otel_endpoint: Option<&str>, json: bool) -> Result<()> {
    let endpoint = resolve_endpoint(std::env::var(OTLP_ENDPOINT_ENV).ok(), otel_endpoint);

    let tracer_provider = match &endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?;
            let service = std::env::var(SERVICE_NAME_ENV).unwrap_or_else(|_| SERVICE.to_string());

            TracerProvider::builder()
                .with_batch_exporter(exporter, runtime::Tokio)
                .with_config(
                    Config::default()
                        .with_sampler(Sampler::AlwaysOn)
                        .with_id_generator(RandomIdGenerator::default())
                        .with_resource(Resource::new(vec![
                            KeyValue::new(SERVICE_NAME, service),
                            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                        ])),
                )
                .build()
        }
        None => TracerProvider::builder()
            .with_config(Config::default().with_sampler(Sampler::AlwaysOff))
            .build(),
    };

    global::set_tracer_provider(tracer_provider.clone());

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer(SERVICE));

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,piageon_runner=debug,piageon_world=info".into());

    let registry = tracing_subscriber::registry().with(filter).with(telemetry_layer);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    match endpoint {
        Some(endpoint) => info!(%endpoint, "Telemetry initialized with OTLP span export"),
        None => info!("Telemetry initialized (OpenTelemetry disabled, no endpoint configured)"),
    }
    Ok(())
}

/// The standard OTLP variable wins over the configured endpoint; blank
/// values count as unset
fn resolve_endpoint(from_env: Option<String>, configured: Option<&str>) -> Option<String> {
    from_env
        .filter(|e| !e.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .filter(|e| !e.trim().is_empty())
}

/// Flush pending spans and shut the exporter down
pub fn shutdown_telemetry() {
    info!("Shutting down telemetry");
    global::shutdown_tracer_provider();
}
