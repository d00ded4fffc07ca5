use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};
use chrono::{Duration, Utc};
use uuid::Uuid;

use therapist_cell::models::CreateUnavailabilityRequest;
use therapist_cell::router::therapist_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockBaasResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    therapist_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_therapist_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let therapist_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .and(query_param("id", format!("eq.{}", therapist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::therapist_response(&therapist_id.to_string())
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", therapist_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], json!(therapist_id.to_string()));
    assert_eq!(body["is_accepting_patients"], json!(true));
}

#[tokio::test]
async fn test_get_therapist_not_found() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_unavailability_for_date() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let therapist_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/unavailability_windows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::unavailability_response(
                &therapist_id.to_string(),
                "2024-06-01T12:00:00+00:00",
                "2024-06-01T13:00:00+00:00",
                "Lunch",
            )
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}/unavailability?date=2024-06-01", therapist_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let windows = body["unavailability"].as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["reason"], json!("Lunch"));
}

#[tokio::test]
async fn test_create_unavailability_as_owner() {
    let mock_server = MockServer::start().await;

    let user = TestUser::therapist("therapist@example.com");
    let therapist_id = Uuid::parse_str(&user.id).unwrap();

    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let starts_at = Utc::now() + Duration::days(2);
    let ends_at = starts_at + Duration::hours(3);

    Mock::given(method("POST"))
        .and(path("/rest/v1/unavailability_windows"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockBaasResponses::unavailability_response(
                &therapist_id.to_string(),
                &starts_at.to_rfc3339(),
                &ends_at.to_rfc3339(),
                "Conference",
            )
        ])))
        .mount(&mock_server)
        .await;

    let request_body = CreateUnavailabilityRequest {
        starts_at,
        ends_at,
        reason: "Conference".to_string(),
        appointment_id: None,
    };

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/unavailability", therapist_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&request_body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["unavailability"]["reason"], json!("Conference"));
}

#[tokio::test]
async fn test_create_unavailability_for_other_therapist_is_unauthorized() {
    let user = TestUser::therapist("therapist@example.com");
    let test_config = TestConfig::default();
    let config = test_config.to_app_config();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let starts_at = Utc::now() + Duration::days(2);
    let request_body = CreateUnavailabilityRequest {
        starts_at,
        ends_at: starts_at + Duration::hours(1),
        reason: "Holiday".to_string(),
        appointment_id: None,
    };

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/unavailability", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&request_body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_unavailability_rejects_inverted_window() {
    let user = TestUser::therapist("therapist@example.com");
    let therapist_id = Uuid::parse_str(&user.id).unwrap();

    let test_config = TestConfig::default();
    let config = test_config.to_app_config();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let starts_at = Utc::now() + Duration::days(2);
    let request_body = CreateUnavailabilityRequest {
        starts_at,
        ends_at: starts_at - Duration::hours(1),
        reason: "Backwards".to_string(),
        appointment_id: None,
    };

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/unavailability", therapist_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&request_body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
