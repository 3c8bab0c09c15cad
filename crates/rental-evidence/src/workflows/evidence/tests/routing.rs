use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::config::EvidenceConfig;
use crate::workflows::evidence::domain::{PhaseKind, RentalKind};
use crate::workflows::evidence::router::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::workflows::evidence::{evidence_router, EvidenceService};

fn router(service: MemoryService) -> Router {
    evidence_router(Arc::new(service))
}

fn request(method: Method, uri: &str, role: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_ID_HEADER, OWNER)
        .header(ACTOR_ROLE_HEADER, role)
        .body(body)
        .expect("request")
}

fn json_request(method: Method, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_ID_HEADER, OWNER)
        .header(ACTOR_ROLE_HEADER, "owner")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn create_then_fetch_rental() {
    let (service, _store, _clock) = build_service();
    let app = router(service);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/rentals",
            json!({
                "kind": "vehicle",
                "title": "Blue hatchback",
                "contract_start": "2025-06-01T09:00:00Z",
                "contract_end": "2025-06-08T09:00:00Z"
            }),
        ))
        .await
        .expect("create response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["state"], "not_started");
    let id = created["id"].as_str().expect("id").to_string();

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/rentals/{id}/areas"),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("areas response");
    assert_eq!(response.status(), StatusCode::OK);
    let areas = body_json(response).await;
    assert_eq!(areas["catalog"]["mode"], "structured");
    assert_eq!(areas["catalog"]["areas"][0]["key"], "front");
}

#[tokio::test]
async fn missing_actor_is_unauthorized() {
    let (service, _store, _clock) = build_service();
    let response = router(service)
        .oneshot(
            Request::builder()
                .uri("/api/v1/rentals")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn photo_upload_and_blocked_completion() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    let app = router(service);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!(
                "/api/v1/rentals/{}/phases/check-in/photos?area=front&latitude=41.6&longitude=-93.6",
                rental.id
            ),
            "owner",
            Body::from(jpeg()),
        ))
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let photo = body_json(response).await;
    assert_eq!(photo["area_key"], "front");
    assert_eq!(photo["location"]["latitude"], 41.6);

    let response = app
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/rentals/{}/phases/check-in/complete", rental.id),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("complete response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "missing_required_areas");
    assert_eq!(body["missing_areas"], json!(["Rear", "Left side", "Right side"]));
}

#[tokio::test]
async fn invalid_payloads_map_to_unprocessable() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    let app = router(service);

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/rentals/{}/phases/check-in/photos?area=front", rental.id),
            "owner",
            Body::from("plain text"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/rentals/{}/phases/handover/signature", rental.id),
            "owner",
            Body::from(png()),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/rentals/{}/comparison?mode=overlay&opacity=150", rental.id),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/rentals/{}/comparison?mode=overlay&opacity=300", rental.id),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("300")));
}

#[tokio::test]
async fn unbounded_image_ceiling_still_accepts_uploads() {
    let (service, _store, _clock) = build_service_with(EvidenceConfig {
        max_image_bytes: usize::MAX,
        ..EvidenceConfig::default()
    });
    let rental = create(&service, RentalKind::Vehicle).await;

    let response = router(service)
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/rentals/{}/phases/check-in/photos?area=front", rental.id),
            "owner",
            Body::from(jpeg()),
        ))
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn checklist_memo_and_report_round() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    let photo = service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some("front")))
        .await
        .expect("photo");
    let app = router(service);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/rentals/{}/phases/check-in/checklists", rental.id),
            json!({ "area_key": "front", "answers": { "dents": "damaged" }, "note": "rear door" }),
        ))
        .await
        .expect("checklist response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["answers"]["dents"], "damaged");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!(
                "/api/v1/rentals/{}/phases/check-in/photos/{}",
                rental.id,
                photo.taken_at.timestamp_millis()
            ),
            json!({ "memo": "dent by handle" }),
        ))
        .await
        .expect("memo response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/rentals/{}/report", rental.id),
            "counterparty",
            Body::empty(),
        ))
        .await
        .expect("report response");
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["sections"][0]["area_key"], "front");
    assert_eq!(
        report["sections"][0]["before"]["photos"][0]["memo"],
        "dent by handle"
    );
    assert_eq!(report["sections"][0]["after"]["slot"], "no_photo");
    assert_eq!(report["signatures"][0]["signature"], "unsigned");
}

#[tokio::test]
async fn deleted_rental_returns_not_found() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Dwelling).await;
    let app = router(service);

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/rentals/{}", rental.id),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("delete response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/rentals/{}", rental.id),
            "owner",
            Body::empty(),
        ))
        .await
        .expect("get response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let service = EvidenceService::new(Arc::new(UnavailableStore), EvidenceConfig::default());
    let response = evidence_router(Arc::new(service))
        .oneshot(request(
            Method::GET,
            "/api/v1/rentals/stats",
            "admin",
            Body::empty(),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}
