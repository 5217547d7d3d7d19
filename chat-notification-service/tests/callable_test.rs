mod common;

use chat_notification_service::services::MockPushProvider;
use common::TestApp;
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Probes
// =============================================================================

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-notification-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

// =============================================================================
// sendChatNotification
// =============================================================================

#[tokio::test]
async fn two_tokens_are_delivered() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(json!({"tokens": ["tokA", "tokB"], "title": "Hi", "body": "There"}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["result"]["response"]["successCount"], 2);
    assert_eq!(body["result"]["response"]["failureCount"], 0);
    assert_eq!(
        body["result"]["response"]["responses"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn report_reaches_caller_unchanged() {
    let report = json!({"tokens": 2, "success": 2, "failure": 0});
    let app = TestApp::spawn_with_provider(Arc::new(MockPushProvider::with_report(report.clone())))
        .await;

    let (status, body) = app
        .call(json!({"tokens": ["tokA", "tokB"], "title": "Hi", "body": "There"}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"result": {"success": true, "response": report}}));
}

#[tokio::test]
async fn empty_tokens_are_rejected_without_sending() {
    let provider = Arc::new(MockPushProvider::new());
    let app = TestApp::spawn_with_provider(provider.clone()).await;

    let (status, body) = app
        .call(json!({"tokens": [], "title": "Hi", "body": "There"}))
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid-argument");
    assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("The function must be called with tokens, title, and body."));
    assert_eq!(provider.send_count(), 0);
}

#[tokio::test]
async fn empty_title_is_rejected_without_sending() {
    let provider = Arc::new(MockPushProvider::new());
    let app = TestApp::spawn_with_provider(provider.clone()).await;

    let (status, body) = app
        .call(json!({"tokens": ["tokA"], "title": "", "body": "There"}))
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "invalid-argument");
    assert_eq!(provider.send_count(), 0);
}

#[tokio::test]
async fn transport_failure_is_reported_as_unknown() {
    let provider = Arc::new(MockPushProvider::failing(
        "error sending request: connection refused",
    ));
    let app = TestApp::spawn_with_provider(provider.clone()).await;

    let (status, body) = app
        .call(json!({"tokens": ["tokA"], "title": "Hi", "body": "There"}))
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "UNKNOWN");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("There was an error: "));
    assert!(message.contains("connection refused"));
    assert!(body.get("result").is_none());
    assert_eq!(provider.send_count(), 1);
}

#[tokio::test]
async fn missing_data_envelope_is_invalid_argument() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/sendChatNotification", app.address))
        .json(&json!({"tokens": ["tokA"], "title": "Hi", "body": "There"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid-argument");
}

#[tokio::test]
async fn non_json_body_is_invalid_argument() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/sendChatNotification", app.address))
        .header("content-type", "text/plain")
        .body("tokens=tokA")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid-argument");
}
