use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, header};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::supabase::{ForeignKeyViolation, SupabaseClient, UniqueViolation};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "secret".to_string(),
        port: 3000,
        clinic_utc_offset_minutes: 0,
    }
}

#[tokio::test]
async fn test_request_sends_api_key_and_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialty", "eq.Cardiology"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/doctors?specialty=eq.Cardiology", Some("user-token"), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_conflict_status_is_unique_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_patient_slot_key\""
        })))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let result: anyhow::Result<Vec<Value>> = client
        .request(Method::POST, "/rest/v1/appointments", Some("token"), Some(json!({})))
        .await;

    let err = result.unwrap_err();
    let violation = err.downcast_ref::<UniqueViolation>().unwrap();
    assert_eq!(violation.constraint, "appointments_patient_slot_key");
}

#[tokio::test]
async fn test_missing_reference_is_foreign_key_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "message": "insert or update on table \"appointments\" violates foreign key constraint \"appointments_patient_id_fkey\"",
            "details": "Key (patient_id)=(6f1c2a52-0000-4000-8000-000000000000) is not present in table \"patients\"."
        })))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let result: anyhow::Result<Vec<Value>> = client
        .request(Method::POST, "/rest/v1/appointments", Some("token"), Some(json!({})))
        .await;

    let err = result.unwrap_err();
    assert!(err.downcast_ref::<UniqueViolation>().is_none());
    assert_eq!(err.downcast_ref::<ForeignKeyViolation>().unwrap().column, "patient_id");
}

#[tokio::test]
async fn test_unparsed_conflict_is_plain_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let result: anyhow::Result<Vec<Value>> = client
        .request(Method::POST, "/rest/v1/appointments", Some("token"), Some(json!({})))
        .await;

    let err = result.unwrap_err();
    assert!(err.downcast_ref::<UniqueViolation>().is_none());
    assert!(err.downcast_ref::<ForeignKeyViolation>().is_none());
}

#[tokio::test]
async fn test_not_found_is_plain_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such table"))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let result: anyhow::Result<Vec<Value>> = client
        .request(Method::GET, "/rest/v1/missing", None, None)
        .await;

    let err = result.unwrap_err();
    assert!(err.downcast_ref::<UniqueViolation>().is_none());
    assert!(err.to_string().contains("Resource not found"));
}

#[tokio::test]
async fn test_empty_body_reads_as_no_rows() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let rows: Vec<Value> = client
        .request(Method::DELETE, "/rest/v1/appointments?id=eq.1", Some("token"), None)
        .await
        .unwrap();

    assert!(rows.is_empty());
}
