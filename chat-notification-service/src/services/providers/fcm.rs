use super::{AccessTokenProvider, BatchResponse, ProviderError, PushProvider, SendResponse};
use crate::config::FcmConfig;
use crate::models::{MulticastMessage, Notification};
use crate::services::metrics::record_provider_send;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::OnceCell;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound FCM accepts for a single multicast.
pub const MAX_MULTICAST_TOKENS: usize = 500;

const NETWORK_ERROR_CODE: &str = "app/network-error";

static DEFAULT_APP: OnceCell<Arc<FcmProvider>> = OnceCell::new();

/// Process-wide FCM client, built on first use.
///
/// Later calls return the instance created by the first successful call and
/// ignore their argument. A failed initialization is not cached.
pub fn initialize_app(config: &FcmConfig) -> Result<Arc<FcmProvider>, ProviderError> {
    DEFAULT_APP
        .get_or_try_init(|| {
            let provider = FcmProvider::new(config.clone())?;
            tracing::info!(
                project_id = provider.project_id().unwrap_or("<unset>"),
                credentials = provider.credentials.kind(),
                "FCM app initialized"
            );
            Ok(Arc::new(provider))
        })
        .cloned()
}

pub struct FcmProvider {
    project_id: Option<String>,
    api_base_url: String,
    max_concurrency: usize,
    client: Client,
    credentials: AccessTokenProvider,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: &'a Notification,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmError,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let credentials = AccessTokenProvider::from_config(&config, client.clone())?;
        let project_id = config
            .project_id
            .clone()
            .or_else(|| credentials.project_id().map(str::to_string))
            .or_else(|| config.environment_project_id.clone());

        if config.require_project_id && project_id.is_none() {
            return Err(ProviderError::Configuration(
                "FCM project id is required but none was found in FCM_PROJECT_ID, \
                 the service account key or GOOGLE_CLOUD_PROJECT"
                    .to_string(),
            ));
        }

        Ok(Self {
            project_id,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            max_concurrency: config.max_concurrency.max(1),
            client,
            credentials,
        })
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn validate(message: &MulticastMessage) -> Result<(), ProviderError> {
        if message.tokens.is_empty() {
            return Err(ProviderError::InvalidMessage(
                "tokens must be a non-empty array".to_string(),
            ));
        }

        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(ProviderError::InvalidMessage(format!(
                "tokens list must not contain more than {} items",
                MAX_MULTICAST_TOKENS
            )));
        }

        if message.tokens.iter().any(|t| t.is_empty()) {
            return Err(ProviderError::InvalidMessage(
                "registration token must be a non-empty string".to_string(),
            ));
        }

        Ok(())
    }

    async fn send_one(
        &self,
        url: &str,
        access_token: &str,
        token: &str,
        notification: &Notification,
    ) -> SendResponse {
        let request = FcmRequest {
            message: FcmMessage {
                token,
                notification,
            },
        };

        let response = match self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                record_provider_send(self.name(), "network_error");
                return SendResponse::failure(
                    NETWORK_ERROR_CODE,
                    format!("Failed to connect to FCM: {}", e),
                );
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            record_provider_send(self.name(), "failure");
            let (code, message) = describe_error(status, &body);
            tracing::debug!(status = %status, code = %code, "FCM rejected a token");
            return SendResponse::failure(code, message);
        }

        match serde_json::from_str::<FcmResponse>(&body) {
            Ok(sent) => {
                record_provider_send(self.name(), "success");
                SendResponse::success(sent.name)
            }
            Err(e) => {
                record_provider_send(self.name(), "failure");
                SendResponse::failure(
                    "messaging/unknown-error",
                    format!("Failed to parse FCM response: {}", e),
                )
            }
        }
    }
}

/// Map an FCM error reply onto a `messaging/*` code and a readable message.
fn describe_error(status: StatusCode, body: &str) -> (&'static str, String) {
    match serde_json::from_str::<FcmErrorResponse>(body) {
        Ok(parsed) => {
            let reason = parsed
                .error
                .details
                .iter()
                .find_map(|d| d.error_code.as_deref())
                .or(parsed.error.status.as_deref())
                .unwrap_or_else(|| status_reason(status));
            (messaging_code(reason), parsed.error.message)
        }
        Err(_) => (
            messaging_code(status_reason(status)),
            format!("FCM API returned error status {}: {}", status, body),
        ),
    }
}

fn status_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "INVALID_ARGUMENT",
        401 => "UNAUTHENTICATED",
        403 => "PERMISSION_DENIED",
        404 => "NOT_FOUND",
        429 => "RESOURCE_EXHAUSTED",
        500 => "INTERNAL",
        503 => "UNAVAILABLE",
        _ => "UNKNOWN",
    }
}

fn messaging_code(reason: &str) -> &'static str {
    match reason {
        "INVALID_ARGUMENT" => "messaging/invalid-argument",
        "NOT_FOUND" | "UNREGISTERED" => "messaging/registration-token-not-registered",
        "PERMISSION_DENIED" | "SENDER_ID_MISMATCH" => "messaging/mismatched-credential",
        "RESOURCE_EXHAUSTED" | "QUOTA_EXCEEDED" => "messaging/message-rate-exceeded",
        "UNAUTHENTICATED" | "THIRD_PARTY_AUTH_ERROR" | "APNS_AUTH_ERROR" => {
            "messaging/third-party-auth-error"
        }
        "UNAVAILABLE" => "messaging/server-unavailable",
        "INTERNAL" => "messaging/internal-error",
        _ => "messaging/unknown-error",
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<serde_json::Value, ProviderError> {
        Self::validate(message)?;

        let project_id = self.project_id.as_deref().ok_or_else(|| {
            ProviderError::Configuration("FCM project_id is not configured".to_string())
        })?;

        let access_token = self.credentials.access_token().await?;
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base_url, project_id
        );

        let sends: Vec<_> = message
            .tokens
            .iter()
            .map(|token| self.send_one(&url, &access_token, token, &message.notification))
            .collect();

        // `buffered` keeps the responses in token order.
        let responses: Vec<SendResponse> = stream::iter(sends)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let batch = BatchResponse::from(responses);

        tracing::info!(
            tokens = message.tokens.len(),
            success_count = batch.success_count,
            failure_count = batch.failure_count,
            "FCM multicast completed"
        );

        Ok(serde_json::json!(batch))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.project_id.is_none() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/test_service_account.pem");

    fn key_file(project_id: &str) -> NamedTempFile {
        let key = serde_json::json!({
            "type": "service_account",
            "project_id": project_id,
            "private_key_id": "kid-1",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "dispatcher@chat-demo.iam.gserviceaccount.com"
        });
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(key.to_string().as_bytes()).unwrap();
        file
    }

    fn key_config(file: &NamedTempFile) -> FcmConfig {
        FcmConfig {
            enabled: true,
            credentials_path: Some(file.path().display().to_string()),
            ..FcmConfig::default()
        }
    }

    fn message_with(tokens: Vec<String>) -> MulticastMessage {
        MulticastMessage {
            tokens,
            notification: Notification {
                title: "Hi".to_string(),
                body: "There".to_string(),
            },
        }
    }

    fn static_config(project_id: &str) -> FcmConfig {
        FcmConfig {
            enabled: true,
            project_id: Some(project_id.to_string()),
            access_token: Some("test-token".to_string()),
            ..FcmConfig::default()
        }
    }

    #[test]
    fn token_limits_are_enforced() {
        assert!(FcmProvider::validate(&message_with(vec!["tokA".into()])).is_ok());

        let too_many = (0..=MAX_MULTICAST_TOKENS).map(|i| format!("tok{}", i)).collect();
        let err = FcmProvider::validate(&message_with(too_many)).unwrap_err();
        assert!(err.to_string().contains("500"));

        let err = FcmProvider::validate(&message_with(vec!["tokA".into(), String::new()]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidMessage(_)));
    }

    #[test]
    fn fcm_error_details_take_precedence_over_status() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }"#;

        let (code, message) = describe_error(StatusCode::NOT_FOUND, body);
        assert_eq!(code, "messaging/registration-token-not-registered");
        assert_eq!(message, "Requested entity was not found.");
    }

    #[test]
    fn unparsable_errors_fall_back_to_http_status() {
        let (code, message) = describe_error(StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        assert_eq!(code, "messaging/server-unavailable");
        assert!(message.contains("upstream down"));

        let (code, _) = describe_error(StatusCode::IM_A_TEAPOT, "");
        assert_eq!(code, "messaging/unknown-error");
    }

    #[tokio::test]
    async fn health_check_requires_project() {
        let provider = FcmProvider::new(FcmConfig {
            project_id: None,
            ..static_config("unused")
        })
        .unwrap();
        assert!(provider.health_check().await.is_err());

        let provider = FcmProvider::new(static_config("chat-demo")).unwrap();
        assert!(provider.health_check().await.is_ok());
    }

    #[test]
    fn key_project_wins_over_environment_project() {
        let file = key_file("key-project");
        let provider = FcmProvider::new(FcmConfig {
            environment_project_id: Some("env-project".to_string()),
            ..key_config(&file)
        })
        .unwrap();
        assert_eq!(provider.project_id(), Some("key-project"));

        let provider = FcmProvider::new(FcmConfig {
            project_id: Some("explicit-project".to_string()),
            environment_project_id: Some("env-project".to_string()),
            ..key_config(&file)
        })
        .unwrap();
        assert_eq!(provider.project_id(), Some("explicit-project"));
    }

    #[test]
    fn environment_project_is_the_last_resort() {
        let provider = FcmProvider::new(FcmConfig {
            project_id: None,
            environment_project_id: Some("env-project".to_string()),
            ..static_config("unused")
        })
        .unwrap();
        assert_eq!(provider.project_id(), Some("env-project"));
    }

    #[test]
    fn required_project_may_come_from_the_key() {
        let file = key_file("key-project");
        let provider = FcmProvider::new(FcmConfig {
            require_project_id: true,
            ..key_config(&file)
        })
        .unwrap();
        assert_eq!(provider.project_id(), Some("key-project"));

        let err = FcmProvider::new(FcmConfig {
            project_id: None,
            require_project_id: true,
            ..static_config("unused")
        })
        .err()
        .unwrap();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn initialize_app_runs_once() {
        let first = initialize_app(&static_config("first-project")).unwrap();
        let second = initialize_app(&static_config("second-project")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.project_id(), Some("first-project"));
    }
}
