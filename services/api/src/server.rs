use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_evidence_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_evidence::config::AppConfig;
use rental_evidence::error::AppError;
use rental_evidence::telemetry;
use rental_evidence::workflows::evidence::{EvidenceService, InMemoryEvidenceStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryEvidenceStore::new(
        config.evidence.blob_base_url.clone(),
    ));
    let evidence_service = Arc::new(EvidenceService::new(store, config.evidence.clone()));

    let app = with_evidence_routes(evidence_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_image_bytes = config.evidence.max_image_bytes,
        "rental evidence service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
