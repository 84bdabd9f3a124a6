use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

// 2030-06-03 is a Monday, far enough ahead that no slot is filtered as past.
const MONDAY: &str = "2030-06-03";
const SATURDAY: &str = "2030-06-08";

fn app(mock_server: &MockServer) -> Router {
    doctor_routes(Arc::new(TestConfig::with_store(&mock_server.uri())))
}

fn token_for(user: &TestUser) -> String {
    JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, Some(1))
}

async fn send(app: Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn mount_doctor(mock_server: &MockServer, doctor: Value) {
    let id = doctor["id"].as_str().unwrap().to_string();
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doctor])))
        .mount(mock_server)
        .await;
}

async fn mount_bookings(mock_server: &MockServer, doctor_id: &str, date: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", format!("eq.{}", date)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_availability_requires_authentication() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let (status, _) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/{}", doctor_id, MONDAY),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_availability_skips_booked_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient = TestUser::patient("ana@example.com");

    mount_doctor(
        &mock_server,
        MockSupabaseResponses::doctor_with_hours(
            &doctor_id,
            "Dra. López",
            "Cardiología",
            json!({ "1": { "start": "09:00", "end": "13:00" } }),
        ),
    )
    .await;
    mount_bookings(
        &mock_server,
        &doctor_id,
        MONDAY,
        json!([{ "id": Uuid::new_v4(), "appointment_time": "10:00" }]),
    )
    .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/{}", doctor_id, MONDAY),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["available"],
        json!(["09:00", "09:30", "10:30", "11:00", "11:30", "12:00", "12:30"])
    );
}

#[tokio::test]
async fn test_availability_on_day_off_is_empty() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient = TestUser::patient("ana@example.com");

    mount_doctor(
        &mock_server,
        MockSupabaseResponses::doctor_response(&doctor_id, "Dr. Ruiz", "Pediatría"),
    )
    .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/{}", doctor_id, SATURDAY),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!([]));
}

#[tokio::test]
async fn test_unknown_doctor_has_no_availability() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient = TestUser::patient("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/{}", doctor_id, MONDAY),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!([]));
}

#[tokio::test]
async fn test_friday_default_schedule_ends_at_one() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let patient = TestUser::patient("ana@example.com");

    mount_doctor(
        &mock_server,
        MockSupabaseResponses::doctor_response(&doctor_id, "Dr. Ruiz", "Pediatría"),
    )
    .await;
    mount_bookings(&mock_server, &doctor_id, "2030-06-07", json!([])).await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/2030-06-07", doctor_id),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"].as_array().unwrap().len(), 8);
    assert_eq!(body["available"][0], "09:00");
    assert_eq!(body["available"][7], "12:30");
}

#[tokio::test]
async fn test_editing_keeps_own_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4();
    let patient = TestUser::patient("ana@example.com");

    mount_doctor(
        &mock_server,
        MockSupabaseResponses::doctor_with_hours(
            &doctor_id,
            "Dra. López",
            "Cardiología",
            json!({ "1": { "start": "09:00", "end": "11:00" } }),
        ),
    )
    .await;
    mount_bookings(
        &mock_server,
        &doctor_id,
        MONDAY,
        json!([
            { "id": appointment_id, "appointment_time": "09:30" },
            { "id": Uuid::new_v4(), "appointment_time": "10:00" }
        ]),
    )
    .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/{}?editing={}", doctor_id, MONDAY, appointment_id),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(["09:00", "09:30", "10:30"]));
}

#[tokio::test]
async fn test_malformed_date_is_rejected() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("ana@example.com");

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}/availability/03-06-2030", Uuid::new_v4()),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_doctors_by_specialty() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("ana@example.com");
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Medicina General"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": first, "full_name": "Dr. Álvarez" },
            { "id": second, "full_name": "Dra. Beltrán" }
        ])))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        "/specialty/Medicina%20General",
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let doctors = body.as_array().unwrap();
    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0]["id"], first.to_string());
    assert_eq!(doctors[1]["full_name"], "Dra. Beltrán");
}

#[tokio::test]
async fn test_specialties_are_distinct_and_sorted() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("select", "specialty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "specialty": "Pediatría" },
            { "specialty": "Cardiología" },
            { "specialty": "Pediatría" },
            { "specialty": " " }
        ])))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        "/specialties",
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["specialties"], json!(["Cardiología", "Pediatría"]));
}

#[tokio::test]
async fn test_get_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        app(&mock_server),
        "GET",
        &format!("/{}", Uuid::new_v4()),
        Some(&token_for(&patient)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor not found");
}

#[tokio::test]
async fn test_working_hours_update_requires_admin() {
    let mock_server = MockServer::start().await;
    let receptionist = TestUser::receptionist("front@example.com");

    let (status, _) = send(
        app(&mock_server),
        "PUT",
        &format!("/{}/working-hours", Uuid::new_v4()),
        Some(&token_for(&receptionist)),
        Some(json!({ "1": { "start": "09:00", "end": "12:00" } })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_working_hours_update_rejects_inverted_interval() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");

    let (status, body) = send(
        app(&mock_server),
        "PUT",
        &format!("/{}/working-hours", Uuid::new_v4()),
        Some(&token_for(&admin)),
        Some(json!({ "2": { "start": "17:00", "end": "09:00" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("start before"));
}

#[tokio::test]
async fn test_working_hours_update_persists_schedule() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let hours = json!({ "6": { "start": "08:00", "end": "12:00" } });

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_with_hours(&doctor_id, "Dr. Ruiz", "Pediatría", hours.clone())
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, body) = send(
        app(&mock_server),
        "PUT",
        &format!("/{}/working-hours", doctor_id),
        Some(&token_for(&admin)),
        Some(hours.clone()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["working_hours"], hours);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");

    let (status, _) = send(
        app(&mock_server),
        "DELETE",
        &format!("/{}", admin.id),
        Some(&token_for(&admin)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_missing_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (status, _) = send(
        app(&mock_server),
        "DELETE",
        &format!("/{}", Uuid::new_v4()),
        Some(&token_for(&admin)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
