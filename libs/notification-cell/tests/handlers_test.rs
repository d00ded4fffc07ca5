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
use uuid::Uuid;

use notification_cell::router::notification_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockBaasResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    notification_routes(Arc::new(config))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_notifications_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::notification_response(&Uuid::new_v4().to_string(), &user.id, false),
            MockBaasResponses::notification_response(&Uuid::new_v4().to_string(), &user.id, true),
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["count"], json!(2));
}

#[tokio::test]
async fn test_unread_count() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("is_read", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/unread-count")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["unread"], json!(3));
}

#[tokio::test]
async fn test_mark_notification_read() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    let notification_id = Uuid::new_v4();
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("id", format!("eq.{}", notification_id)))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBaasResponses::notification_response(&notification_id.to_string(), &user.id, true)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/read", notification_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["notification"]["is_read"], json!(true));
}

#[tokio::test]
async fn test_mark_read_unknown_notification_is_not_found() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    // Filtered PATCH matches nothing, so the backend returns an empty set
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/read", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_all_read() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("patient@example.com");
    let test_config = TestConfig::default();
    let mut config = test_config.to_app_config();
    config.baas_url = mock_server.uri();

    let app = create_test_app(config.clone());
    let token = JwtTestUtils::create_test_token(&user, &config.baas_jwt_secret, Some(24));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/notifications"))
        .and(query_param("is_read", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/read-all")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
