#![allow(dead_code)]

use chat_notification_service::config::{DispatcherConfig, FcmConfig};
use chat_notification_service::services::{FcmProvider, MockPushProvider, PushProvider};
use chat_notification_service::startup::Application;
use reqwest::Client;
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const TEST_PROJECT: &str = "chat-test";
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
}

pub fn test_config(fcm: FcmConfig) -> DispatcherConfig {
    DispatcherConfig {
        // Use random port for testing (port 0)
        common: CoreConfig {
            port: 0,
            ..CoreConfig::default()
        },
        fcm,
    }
}

/// FCM settings pointing at a fake API with a static bearer token.
pub fn fcm_config(api_base_url: &str) -> FcmConfig {
    FcmConfig {
        enabled: true,
        project_id: Some(TEST_PROJECT.to_string()),
        access_token: Some(TEST_ACCESS_TOKEN.to_string()),
        api_base_url: api_base_url.to_string(),
        ..FcmConfig::default()
    }
}

impl TestApp {
    /// Spawn the service backed by the mock push provider.
    pub async fn spawn() -> Self {
        Self::spawn_with_provider(Arc::new(MockPushProvider::new())).await
    }

    /// Spawn the service backed by a real FCM client talking to `api_base_url`.
    pub async fn spawn_with_fcm(api_base_url: &str) -> Self {
        let provider = FcmProvider::new(fcm_config(api_base_url)).expect("Failed to build FCM provider");
        Self::spawn_with_provider(Arc::new(provider)).await
    }

    pub async fn spawn_with_provider(provider: Arc<dyn PushProvider>) -> Self {
        let app = Application::build_with_provider(test_config(FcmConfig::default()), provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    /// Invoke the callable function with `data` and return status and JSON body.
    pub async fn call(&self, data: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/sendChatNotification", self.address))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await
            .expect("Failed to execute request");

        let status = response.status().as_u16();
        let body = response.json().await.expect("Failed to parse response");
        (status, body)
    }
}
