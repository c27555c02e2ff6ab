use effects::{ErrorResponse, HealthResponse};
use serde_json::json;
use tokio::net::TcpListener;

use super::*;
use crate::state::test_helpers::test_app_state;

const SMALL_LIMIT: usize = 64;

async fn serve(max_body_bytes: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(test_app_state(None, None), max_body_bytes);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn oversized_body_is_a_json_413() {
    let base = serve(SMALL_LIMIT).await;
    let image = format!("data:image/png;base64,{}", "A".repeat(SMALL_LIMIT * 4));

    for path in ["/edit-image", "/api/edit-image"] {
        let response = reqwest::Client::new()
            .post(format!("{base}{path}"))
            .json(&json!({ "image": image, "command": "make it sepia" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
        let content_type = response.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_owned();
        assert!(content_type.starts_with("application/json"), "{content_type}");
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, "E_PAYLOAD_TOO_LARGE");
        assert_eq!(body.error, "Request body too large");
    }
}

#[tokio::test]
async fn body_within_limit_reaches_the_handler() {
    let base = serve(SMALL_LIMIT).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/edit-image"))
        .json(&json!({ "image": "", "command": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "E_VALIDATION");
}

#[tokio::test]
async fn health_routes_respond() {
    let base = serve(SMALL_LIMIT).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let health: HealthResponse = client
        .get(format!("{base}/api/edit-image"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.endpoints.edit, "POST /api/edit-image");
}
