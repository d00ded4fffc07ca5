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

use patient_cell::models::UpdateProfileRequest;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockBaasResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    patient_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_my_profile_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_profiles"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::patient_profile_response(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["profile"]["id"], json!(user.id));
}

#[tokio::test]
async fn test_get_my_profile_missing_returns_friendly_not_found() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("new-user@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patient_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not been set up"));
}

#[tokio::test]
async fn test_update_my_profile_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patient_profiles"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::patient_profile_response(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request_body = UpdateProfileRequest {
        full_name: Some("Updated Name".to_string()),
        phone_number: Some("+353851234567".to_string()),
        date_of_birth: None,
        timezone: Some("Europe/Dublin".to_string()),
        emergency_contact_name: None,
        emergency_contact_phone: None,
    };

    let request = Request::builder()
        .method("PATCH")
        .uri("/me")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&request_body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_my_profile_rejects_empty_name() {
    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let config = test_config.to_app_config();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let request_body = UpdateProfileRequest {
        full_name: Some("   ".to_string()),
        phone_number: None,
        date_of_birth: None,
        timezone: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
    };

    let request = Request::builder()
        .method("PATCH")
        .uri("/me")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&request_body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_requires_valid_token() {
    let test_config = TestConfig::default();
    let config = test_config.to_app_config();
    let app = create_test_app(config);

    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_invalid_signature_token(&user);

    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
