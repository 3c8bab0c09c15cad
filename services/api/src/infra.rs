use metrics_exporter_prometheus::PrometheusHandle;
use rental_evidence::workflows::evidence::{RentalKind, ValidationError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_kind(raw: &str) -> Result<RentalKind, String> {
    RentalKind::parse(raw).ok_or_else(|| ValidationError::UnknownKind(raw.to_string()).to_string())
}
