//! Log and span output for the control loop.
//!
//! [`init_tracing`] installs the global subscriber.  Console output is always
//! on; span export to an OpenTelemetry collector is added only when a
//! collector is configured.
//!
//! | Variable | Read as |
//! |---|---|
//! | `RUST_LOG` | filter directives, `info` when unset |
//! | `NORTHSTAR_LOG_FORMAT` | `json` for one JSON object per line, anything else for compact text |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | collector base URL; enables OTLP/HTTP span export |
//!
//! ```rust,no_run
//! let _telemetry = northstar_runtime::telemetry::init_tracing("northstar");
//! // ... run maneuvers; spans are exported until `_telemetry` drops.
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber for `service_name`.
///
/// Panics if a global subscriber is already set, so call it once from `main`.
/// Keep the returned guard alive until exit: the maneuver and tick spans
/// reach the collector only while it lives.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let output = match std::env::var("NORTHSTAR_LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    let provider = otlp_provider(service_name);
    let export = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("northstar")));

    tracing_subscriber::registry()
        .with(output)
        .with(export)
        .with(filter)
        .init();

    TracerProviderGuard(provider)
}

/// Owns the span exporter, if any.  Dropping it shuts the exporter down.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        let Some(provider) = self.0.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            eprintln!("northstar: span exporter did not shut down cleanly: {e}");
        }
    }
}

/// `None` without an endpoint, or when the exporter cannot be built.
fn otlp_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.clone())
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("northstar: no span export to {endpoint}: {e}");
            return None;
        }
    };

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Synchronous export: the control loop runs without an async runtime.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_endpoint_means_no_exporter() {
        // SAFETY: no other test in this crate reads this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(otlp_provider("northstar-test").is_none());
    }

    #[test]
    fn empty_guard_drops_quietly() {
        drop(TracerProviderGuard(None));
    }
}
