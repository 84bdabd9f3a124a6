use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthContext, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            port: 3000,
            clinic_utc_offset_minutes: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    /// App config pointed at a mock store.
    pub fn with_store(url: &str) -> AppConfig {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
        .to_app_config()
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "receptionist")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_default()
    }

    pub fn to_context(&self) -> AuthContext {
        AuthContext {
            user_id: self.uuid(),
            email: Some(self.email.clone()),
            role: Role::from_claim(Some(&self.role)),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned store rows shaped like the PostgREST tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// Doctor working Mon-Thu 09:00-17:00 and Fri 09:00-13:00.
    pub fn doctor_response(doctor_id: &str, full_name: &str, specialty: &str) -> Value {
        Self::doctor_with_hours(doctor_id, full_name, specialty, json!({
            "1": { "start": "09:00", "end": "17:00" },
            "2": { "start": "09:00", "end": "17:00" },
            "3": { "start": "09:00", "end": "17:00" },
            "4": { "start": "09:00", "end": "17:00" },
            "5": { "start": "09:00", "end": "13:00" }
        }))
    }

    pub fn doctor_with_hours(doctor_id: &str, full_name: &str, specialty: &str, working_hours: Value) -> Value {
        json!({
            "id": doctor_id,
            "full_name": full_name,
            "email": format!("{}@clinic.test", doctor_id),
            "specialty": specialty,
            "license_number": "CED-123456",
            "phone": "5512345678",
            "address": "Consultorio 4",
            "profile_image_url": null,
            "working_hours": working_hours,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, email: &str, full_name: &str) -> Value {
        json!({
            "id": patient_id,
            "full_name": full_name,
            "email": email,
            "phone": "5598765432",
            "address": "Calle 1",
            "date_of_birth": "1990-01-01",
            "insurance_number": "NSS-0001",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: NaiveDate,
        time: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date.format("%Y-%m-%d").to_string(),
            "appointment_time": time,
            "reason": "Revisión general",
            "completed_at": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
