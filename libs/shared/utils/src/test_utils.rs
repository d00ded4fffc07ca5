use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub baas_url: String,
    pub baas_anon_key: String,
    pub payment_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            baas_url: "http://localhost:54321".to_string(),
            baas_anon_key: "test-anon-key".to_string(),
            payment_base_url: "http://localhost:54322".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            baas_url: self.baas_url.clone(),
            baas_anon_key: self.baas_anon_key.clone(),
            baas_jwt_secret: self.jwt_secret.clone(),
            payment_gateway_base_url: self.payment_base_url.clone(),
            payment_key_id: "test-key-id".to_string(),
            payment_key_secret: "test-key-secret".to_string(),
            payment_webhook_secret: "test-webhook-secret".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
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

    pub fn therapist(email: &str) -> Self {
        Self::new(email, "therapist")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
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
            "role": user.role,
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

pub struct MockBaasResponses;

impl MockBaasResponses {
    pub fn patient_profile_response(user_id: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "email": "patient@example.com",
            "full_name": "Test Patient",
            "phone_number": null,
            "date_of_birth": null,
            "timezone": "UTC",
            "emergency_contact_name": null,
            "emergency_contact_phone": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn therapist_response(therapist_id: &str) -> serde_json::Value {
        json!({
            "id": therapist_id,
            "full_name": "Dr. Test Therapist",
            "email": "therapist@example.com",
            "specialization": "Cognitive Behavioral Therapy",
            "bio": "Experienced therapist",
            "avatar_url": null,
            "session_fee_cents": 150000,
            "currency": "INR",
            "work_day_starts": "08:00:00",
            "work_day_ends": "20:00:00",
            "is_accepting_patients": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        therapist_id: &str,
        scheduled_at: &str,
        duration_minutes: i32,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "therapist_id": therapist_id,
            "scheduled_at": scheduled_at,
            "duration_minutes": duration_minutes,
            "session_type": "video",
            "status": "upcoming",
            "payment_status": "paid",
            "amount_cents": 150000,
            "currency": "INR",
            "provider_order_id": "order_test123",
            "provider_payment_id": "pay_test123",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn unavailability_response(
        therapist_id: &str,
        starts_at: &str,
        ends_at: &str,
        reason: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "therapist_id": therapist_id,
            "starts_at": starts_at,
            "ends_at": ends_at,
            "reason": reason,
            "appointment_id": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn notification_response(notification_id: &str, user_id: &str, is_read: bool) -> serde_json::Value {
        json!({
            "id": notification_id,
            "user_id": user_id,
            "kind": "session_reminder",
            "appointment_id": null,
            "title": "Session reminder",
            "body": "Your session starts in one hour",
            "is_read": is_read,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
