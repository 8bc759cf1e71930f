//! HTTP server for exposing Prometheus metrics.
//!
//! This module provides an Axum-based HTTP server that serves the `/metrics`
//! endpoint for Prometheus scraping and a `/health` endpoint for health checks.

use crate::error::{Result, SriovError};
use crate::metrics::MetricsExporter;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state.
#[derive(Clone)]
struct AppState {
    exporter: Arc<MetricsExporter>,
}

/// Build the exporter's router.
pub fn router(exporter: Arc<MetricsExporter>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { exporter })
}

/// Start the HTTP server.
///
/// # Arguments
///
/// * `listen_address` - Address to bind to (e.g., "0.0.0.0:9808")
/// * `exporter` - Registry with the sriovnet collector
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use sriovnet_exporter::collector::SriovNetCollector;
/// use sriovnet_exporter::metrics::MetricsExporter;
/// use sriovnet_exporter::reader::ReaderRegistry;
/// use sriovnet_exporter::server::start_server;
/// use sriovnet_exporter::sysfs::HostSysfs;
///
/// #[tokio::main]
/// async fn main() {
///     let collector = SriovNetCollector::new(
///         Arc::new(HostSysfs::default()),
///         ReaderRegistry::with_defaults(),
///         "node",
///     )
///     .unwrap();
///     let exporter = MetricsExporter::new(collector).unwrap();
///     start_server("0.0.0.0:9808", exporter).await.unwrap();
/// }
/// ```
pub async fn start_server(listen_address: &str, exporter: MetricsExporter) -> Result<()> {
    info!("Starting HTTP server on {}", listen_address);

    let listener = TcpListener::bind(listen_address).await?;
    serve(listener, Arc::new(exporter)).await
}

/// Serve the exporter on an already bound listener.
pub async fn serve(listener: TcpListener, exporter: Arc<MetricsExporter>) -> Result<()> {
    axum::serve(listener, router(exporter))
        .await
        .map_err(|e| SriovError::Server(e.to_string()))?;

    Ok(())
}

/// Handler for /metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    debug!("Received metrics scrape request");

    // The collection pass is blocking sysfs I/O
    let exporter = state.exporter.clone();
    let encoded = tokio::task::spawn_blocking(move || exporter.encode())
        .await
        .map_err(|e| SriovError::Server(e.to_string()))
        .and_then(|result| result);

    match encoded {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Handler for root endpoint.
async fn root_handler() -> Response {
    let html = r#"
<!DOCTYPE html>
<html>
<head>
    <title>SR-IOV Net Exporter</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        h1 { color: #333; }
        a { color: #0066cc; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .info { background: #f0f0f0; padding: 15px; border-radius: 5px; margin: 20px 0; }
    </style>
</head>
<body>
    <h1>SR-IOV Net Exporter</h1>
    <div class="info">
        <p>Per-VF statistics of SR-IOV network devices</p>
        <p><strong>Endpoints:</strong></p>
        <ul>
            <li><a href="/metrics">/metrics</a> - Prometheus metrics</li>
            <li><a href="/health">/health</a> - Health check</li>
        </ul>
    </div>
</body>
</html>
"#;

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response()
}
