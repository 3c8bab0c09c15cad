//! HTTP surface over [`EvidenceService`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::catalog::{checklist_template, AreaCatalog, ChecklistItem};
use super::checklists::ChecklistUpdate;
use super::comparison::RenderMode;
use super::domain::{Actor, GeoPoint, PhaseKind, Rental, RentalId, Role, UserId};
use super::errors::{EvidenceError, ValidationError};
use super::lifecycle::{LifecycleState, NewRental};
use super::photos::PhotoUpload;
use super::service::EvidenceService;
use super::store::EvidenceStore;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Seconds clients should wait before retrying after a store outage.
const RETRY_AFTER_SECS: &str = "1";
/// Headroom over the image ceiling so oversized uploads reach validation instead of the limiter.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

type SharedService<S> = Arc<EvidenceService<S>>;

/// Router builder exposing rental evidence endpoints.
pub fn evidence_router<S>(service: Arc<EvidenceService<S>>) -> Router
where
    S: EvidenceStore + 'static,
{
    let body_limit = service
        .config()
        .max_image_bytes
        .saturating_add(BODY_LIMIT_HEADROOM);
    Router::new()
        .route(
            "/api/v1/rentals",
            post(create_handler::<S>).get(list_handler::<S>),
        )
        .route("/api/v1/rentals/stats", get(stats_handler::<S>))
        .route(
            "/api/v1/rentals/:rental_id",
            get(rental_handler::<S>).delete(delete_handler::<S>),
        )
        .route("/api/v1/rentals/:rental_id/areas", get(areas_handler::<S>))
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/photos",
            post(add_photo_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/areas/:area_key/photos",
            get(area_photos_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/photos/:taken_at_ms",
            patch(edit_memo_handler::<S>).delete(delete_photo_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/checklists",
            put(checklist_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/signature",
            put(signature_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/phases/:phase/complete",
            post(complete_handler::<S>),
        )
        .route(
            "/api/v1/rentals/:rental_id/comparison",
            get(comparison_handler::<S>),
        )
        .route("/api/v1/rentals/:rental_id/report", get(report_handler::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

impl IntoResponse for EvidenceError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            Self::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message, "code": "validation" })),
            )
                .into_response(),
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message, "code": "not_found" })),
            )
                .into_response(),
            Self::Incomplete(blocker) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": message,
                    "code": blocker.code(),
                    "missing_areas": blocker.missing_area_names(),
                })),
            )
                .into_response(),
            Self::Forbidden { .. } | Self::CreateForbidden { .. } => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": message, "code": "forbidden" })),
            )
                .into_response(),
            Self::Conflict(_) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": message, "code": "conflict" })),
            )
                .into_response(),
            Self::StoreUnavailable(_) => {
                warn!(error = %message, "evidence store unavailable");
                let mut response = (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": message, "code": "store_unavailable" })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
                response
            }
        }
    }
}

/// Failures raised before a request reaches the service.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("missing {0} header")]
    MissingActor(&'static str),
    #[error("unknown actor role '{0}'")]
    UnknownRole(String),
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

impl From<ValidationError> for RouteError {
    fn from(error: ValidationError) -> Self {
        Self::Evidence(error.into())
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            Self::Evidence(error) => error.into_response(),
            other => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": other.to_string(), "code": "unauthenticated" })),
            )
                .into_response(),
        }
    }
}

/// Reads the caller identity forwarded by the authenticating proxy.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, RouteError> {
    let user_id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(RouteError::MissingActor(ACTOR_ID_HEADER))?;
    let role = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(RouteError::MissingActor(ACTOR_ROLE_HEADER))?;
    let role = match role.trim().to_ascii_lowercase().as_str() {
        "owner" => Role::Owner,
        "counterparty" | "renter" => Role::Counterparty,
        "admin" => Role::Admin,
        other => return Err(RouteError::UnknownRole(other.to_string())),
    };

    Ok(Actor {
        user_id: UserId(user_id.to_string()),
        role,
    })
}

fn parse_phase(value: &str) -> Result<PhaseKind, ValidationError> {
    PhaseKind::parse(value).ok_or_else(|| ValidationError::UnknownPhase(value.to_string()))
}

fn parse_taken_at(millis: i64) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp_millis(millis).ok_or(ValidationError::InvalidTimestamp(millis))
}

#[derive(Debug, Serialize)]
struct RentalView {
    #[serde(flatten)]
    rental: Rental,
    state: LifecycleState,
    state_label: &'static str,
}

impl RentalView {
    fn from_rental(rental: Rental) -> Self {
        let state = LifecycleState::of(&rental);
        Self {
            rental,
            state,
            state_label: state.label(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AreasView {
    catalog: AreaCatalog,
    checklist_items: &'static [ChecklistItem],
}

#[derive(Debug, Default, Deserialize)]
struct PhotoQuery {
    area: Option<String>,
    memo: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MemoBody {
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChecklistBody {
    #[serde(default)]
    area_key: Option<String>,
    #[serde(flatten)]
    update: ChecklistUpdate,
}

#[derive(Debug, Default, Deserialize)]
struct ComparisonQuery {
    mode: Option<String>,
    opacity: Option<u32>,
}

async fn create_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Json(request): Json<NewRental>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let rental = service.create_rental(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(RentalView::from_rental(rental))).into_response())
}

async fn list_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let rentals: Vec<RentalView> = service
        .list_rentals(&actor)
        .await?
        .into_iter()
        .map(RentalView::from_rental)
        .collect();
    Ok(Json(json!({ "rentals": rentals })).into_response())
}

async fn stats_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let stats = service.statistics(&actor).await?;
    Ok(Json(stats).into_response())
}

async fn rental_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(rental_id): Path<String>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let rental = service.get_rental(&actor, &RentalId(rental_id)).await?;
    Ok(Json(RentalView::from_rental(rental)).into_response())
}

async fn delete_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(rental_id): Path<String>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    service.delete_rental(&actor, &RentalId(rental_id)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn areas_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(rental_id): Path<String>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let rental = service.get_rental(&actor, &RentalId(rental_id)).await?;
    Ok(Json(AreasView {
        catalog: rental.catalog(),
        checklist_items: checklist_template(rental.kind),
    })
    .into_response())
}

async fn add_photo_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase)): Path<(String, String)>,
    Query(query): Query<PhotoQuery>,
    body: Bytes,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let location = match (query.latitude, query.longitude) {
        (Some(latitude), Some(longitude)) => GeoPoint::new(latitude, longitude),
        _ => None,
    };
    let upload = PhotoUpload {
        area_key: query.area,
        image: body.to_vec(),
        memo: query.memo,
        location,
    };

    let record = service
        .add_photo(&actor, &RentalId(rental_id), phase, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn area_photos_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase, area_key)): Path<(String, String, String)>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let photos = service
        .area_photos(&actor, &RentalId(rental_id), phase, &area_key)
        .await?;
    Ok(Json(json!({ "area_key": area_key, "photos": photos })).into_response())
}

async fn edit_memo_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase, taken_at_ms)): Path<(String, String, i64)>,
    Json(body): Json<MemoBody>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let taken_at = parse_taken_at(taken_at_ms)?;
    let record = service
        .edit_memo(&actor, &RentalId(rental_id), phase, taken_at, body.memo)
        .await?;
    Ok(Json(record).into_response())
}

async fn delete_photo_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase, taken_at_ms)): Path<(String, String, i64)>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let taken_at = parse_taken_at(taken_at_ms)?;
    service
        .delete_photo(&actor, &RentalId(rental_id), phase, taken_at)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn checklist_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase)): Path<(String, String)>,
    Json(body): Json<ChecklistBody>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let entry = service
        .update_checklist(
            &actor,
            &RentalId(rental_id),
            phase,
            body.area_key.as_deref(),
            body.update,
        )
        .await?;
    Ok(Json(entry).into_response())
}

async fn signature_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let signature = service
        .set_signature(&actor, &RentalId(rental_id), phase, body.to_vec())
        .await?;
    Ok(Json(signature).into_response())
}

async fn complete_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path((rental_id, phase)): Path<(String, String)>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let phase = parse_phase(&phase)?;
    let completion = service
        .complete_phase(&actor, &RentalId(rental_id), phase)
        .await?;
    Ok(Json(completion).into_response())
}

async fn comparison_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(rental_id): Path<String>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let mode = RenderMode::parse(query.mode.as_deref(), query.opacity)?;
    let comparison = service
        .compare(&actor, &RentalId(rental_id), mode)
        .await?;
    Ok(Json(comparison).into_response())
}

async fn report_handler<S>(
    State(service): State<SharedService<S>>,
    headers: HeaderMap,
    Path(rental_id): Path<String>,
) -> Result<Response, RouteError>
where
    S: EvidenceStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let report = service.report(&actor, &RentalId(rental_id)).await?;
    Ok(Json(report).into_response())
}
