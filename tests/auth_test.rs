// Jaskier Shared Pattern -- backend integration test
// Login/logout cookie flow and the obfuscation middleware.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use infraplane::config::{AuthConfig, Config, MonitoringConfig};
use infraplane::control_plane;
use infraplane::credentials::CredentialRecord;
use infraplane::telemetry::Broadcaster;

const TEST_USERNAME: &str = "operator";
const TEST_PASSWORD: &str = "correct-horse-battery-staple";

fn test_config(obfuscate: bool) -> Config {
    let password_hash = CredentialRecord::hash_password(TEST_PASSWORD).unwrap();
    Config {
        auth: AuthConfig {
            username: TEST_USERNAME.to_string(),
            password_hash,
            ..Default::default()
        },
        monitoring: MonitoringConfig { obfuscate_api: obfuscate, ..Default::default() },
        ..Default::default()
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let (state, _) = infraplane::bootstrap(test_config(false), Broadcaster::new()).await;
    let router = control_plane::create_control_router(state);

    let body = serde_json::json!({ "username": TEST_USERNAME, "password": "wrong" });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_access_protected_route_with_cookie() {
    let (state, _) = infraplane::bootstrap(test_config(false), Broadcaster::new()).await;
    let router = control_plane::create_control_router(state);

    let body = serde_json::json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD });
    let login_response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(login_response.status(), StatusCode::OK);
    let set_cookie = login_response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

    let status_response = router
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header("cookie", cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(status_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn obfuscation_disabled_by_default_leaves_health_readable() {
    let (state, _) = infraplane::bootstrap(test_config(false), Broadcaster::new()).await;
    let router = control_plane::create_control_router(state);

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ok");
}

#[tokio::test]
async fn obfuscation_enabled_base64_encodes_json_body() {
    let (state, _) = infraplane::bootstrap(test_config(true), Broadcaster::new()).await;
    let router = control_plane::create_control_router(state);

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-obfuscated").unwrap(), "true");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // A base64 blob, not the plain `{"success":...}` envelope.
    assert!(!bytes.starts_with(b"{"));
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &bytes).unwrap();
    let json: Value = serde_json::from_slice(&decoded).unwrap();
    assert_eq!(json["data"]["status"], "ok");
}
