//! HTTP API tests driving the router with the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use portal_auth::IdentityTokenAuthenticator;
use portal_core::{EnrollmentService, EventId};
use portal_testing::{FixedClock, InMemoryEnrollmentStore, fixtures, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;
use teacher_portal::{AppState, build_router, metrics};
use tower::ServiceExt;

const SECRET: &str = "http-test-secret";
const TEACHER_A: &str = "1000000001";
const TEACHER_B: &str = "1000000002";
const TEACHER_C: &str = "1000000003";

async fn seeded_store() -> InMemoryEnrollmentStore {
    let store = InMemoryEnrollmentStore::new();
    store.add_event(fixtures::event(1, 2, 1)).await;
    store.add_event(fixtures::event(2, 10, 0)).await;
    store.add_teacher(fixtures::teacher(1, TEACHER_A)).await;
    store.add_teacher(fixtures::teacher(2, TEACHER_B)).await;
    store.add_teacher(fixtures::teacher(3, TEACHER_C)).await;
    store
}

fn app(store: &InMemoryEnrollmentStore, clock: FixedClock) -> Router {
    let clock = Arc::new(clock);
    let service = EnrollmentService::new(Arc::new(store.clone()), clock.clone());
    let authenticator = IdentityTokenAuthenticator::new(SECRET, clock).unwrap();
    build_router(AppState::new(
        service,
        authenticator,
        metrics::detached_handle().unwrap(),
    ))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn token_for(app: &Router, national_id: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/identity/token",
        None,
        Some(json!({ "nationalId": national_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

fn enroll_body(teacher_id: i64, event_id: i64, guests: &[(&str, &str)]) -> Value {
    json!({
        "teacherId": teacher_id,
        "eventId": event_id,
        "hasAccessibilityNeeds": false,
        "hasGuests": !guests.is_empty(),
        "guests": guests
            .iter()
            .map(|(id, name)| json!({ "guestNationalId": id, "guestName": name }))
            .collect::<Vec<_>>(),
    })
}

#[tokio::test]
async fn test_seats_run_out_in_order() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana")])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["remainingSeats"], 1);
    assert_eq!(body["guestCount"], 1);
    assert_eq!(body["accessibilityAssociationsWritten"], 0);
    assert!(body["enrollmentId"].is_number());
    assert!(body["message"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(2, 1, &[])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["remainingSeats"], 0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(3, 1, &[])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    assert_eq!(store.event(EventId::new(1)).await.unwrap().remaining_seats, 0);
}

#[tokio::test]
async fn test_duplicate_enrollment_is_conflict() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let first = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 2, &[])),
    )
    .await;
    assert_eq!(first.0, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 2, &[])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_add_guests_beyond_quota_is_rejected() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana")])),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments/guests",
        None,
        Some(json!({
            "teacherId": 1,
            "eventId": 1,
            "guests": [{ "guestNationalId": "G2", "guestName": "Bruno" }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("guest slot(s) remaining")
    );
    assert_eq!(store.guest_rows().await, 1);
}

#[tokio::test]
async fn test_add_guests_within_quota() {
    let store = seeded_store().await;
    store.add_event(fixtures::event(3, 5, 3)).await;
    let app = app(&store, test_clock());
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 3, &[("G1", "Ana")])),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments/guests",
        None,
        Some(json!({
            "teacherId": 1,
            "eventId": 3,
            "guests": [{ "guestNationalId": "G2", "guestName": "Bruno" }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["currentGuestCount"], 2);
    assert_eq!(body["maxGuests"], 3);
    assert_eq!(body["remainingGuestSlots"], 1);
}

#[tokio::test]
async fn test_enrollment_status() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/enrollments/status/1/1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isEnrolled": false }));

    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana")])),
    )
    .await;

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/enrollments/status/1/1",
        None,
        None,
    )
    .await;
    assert_eq!(body["isEnrolled"], true);
    assert_eq!(body["status"], "enrolled");
    assert_eq!(
        body["guestCounts"],
        json!({ "current": 1, "max": 1, "remaining": 0 })
    );
    assert_eq!(body["canAddMoreGuests"], false);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/enrollments/status/99/1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_cancel_requires_token_and_is_idempotent() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana")])),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments/cancel",
        None,
        Some(json!({ "eventId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let token = token_for(&app, TEACHER_A).await;
    let (status, first) = send(
        &app,
        Method::POST,
        "/api/enrollments/cancel",
        Some(&token),
        Some(json!({ "eventId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["remainingSeats"], 2);

    let (status, second) = send(
        &app,
        Method::POST,
        "/api/enrollments/cancel",
        Some(&token),
        Some(json!({ "enrollmentId": first["enrollmentId"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["message"], first["message"]);
    assert_eq!(second["remainingSeats"], 2);
}

#[tokio::test]
async fn test_cancel_without_target_is_bad_request() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    let token = token_for(&app, TEACHER_A).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments/cancel",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_cancel_other_teachers_enrollment_is_not_found() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    let (_, enrolled) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 2, &[])),
    )
    .await;

    let token = token_for(&app, TEACHER_B).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments/cancel",
        Some(&token),
        Some(json!({ "enrollmentId": enrolled["enrollmentId"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.event(EventId::new(2)).await.unwrap().remaining_seats, 9);
}

#[tokio::test]
async fn test_accessibility_is_replaced_per_enrollment() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    for (event_id, categories) in [(1, json!([1, 3])), (2, json!([2]))] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/enrollments",
            None,
            Some(json!({
                "teacherId": 1,
                "eventId": event_id,
                "hasAccessibilityNeeds": true,
                "accessibilityCategoryIds": categories,
                "hasGuests": false,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let token = token_for(&app, TEACHER_A).await;
    let (status, body) = send(&app, Method::GET, "/api/me/accessibility", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categoryIds"], json!([2]));
}

#[tokio::test]
async fn test_request_validation() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(json!({ "teacherId": "one", "eventId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(json!({ "teacherId": 1, "eventId": 1, "hasGuests": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana"), ("G1", "Ana again")])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments/guests",
        None,
        Some(json!({ "teacherId": 1, "eventId": 1, "guests": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(store.enrollments().await.is_empty());
}

#[tokio::test]
async fn test_identity_token_lifecycle() {
    let store = seeded_store().await;
    let issued_at = test_clock();
    let token = token_for(&app(&store, issued_at), TEACHER_A).await;

    let later = app(&store, issued_at.advanced_by(chrono::Duration::hours(1)));
    let (status, body) = send(&later, Method::GET, "/api/identity/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["teacher"]["id"], 1);
    assert_eq!(body["teacher"]["nationalId"], TEACHER_A);
    assert_eq!(
        body["expiresAt"].as_i64().unwrap() - body["issuedAt"].as_i64().unwrap(),
        86_400
    );

    let expired = app(&store, issued_at.advanced_by(chrono::Duration::hours(25)));
    let (status, body) = send(&expired, Method::GET, "/api/identity/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    let token = token_for(&app, TEACHER_A).await;

    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let (status, _) = send(&app, Method::GET, "/api/identity/me", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_issue_token_lookup_failures() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/identity/token",
        None,
        Some(json!({ "nationalId": "0000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/identity/token",
        None,
        Some(json!({ "nationalId": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_my_enrollments_and_guests() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[("G1", "Ana")])),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 2, &[])),
    )
    .await;
    let token = token_for(&app, TEACHER_A).await;

    let (status, body) = send(&app, Method::GET, "/api/me/enrollments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let enrollments = body.as_array().unwrap();
    assert_eq!(enrollments.len(), 2);
    assert_eq!(enrollments[0]["eventId"], 2);
    assert_eq!(enrollments[1]["eventId"], 1);
    assert_eq!(enrollments[1]["status"], "enrolled");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/me/events/1/guests",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "guestNationalId": "G1", "guestName": "Ana" }])
    );
}

#[tokio::test]
async fn test_occupancy_report() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());
    send(
        &app,
        Method::POST,
        "/api/enrollments",
        None,
        Some(enroll_body(1, 1, &[])),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/events/1/occupancy", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 2);
    assert_eq!(body["remainingSeats"], 1);
    assert_eq!(body["activeEnrollments"], 1);
    assert_eq!(body["cancelledEnrollments"], 0);
    assert_eq!(body["maxGuestsPerTeacher"], 1);
}

#[tokio::test]
async fn test_health_ready_and_metrics() {
    let store = seeded_store().await;
    let app = app(&store, test_clock());

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));
}
