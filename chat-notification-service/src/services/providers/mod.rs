pub mod credentials;
pub mod fcm;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MulticastMessage;

pub use credentials::{AccessTokenProvider, ServiceAccountKey};
pub use fcm::{initialize_app, FcmProvider, MAX_MULTICAST_TOKENS};
pub use mock::MockPushProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Per-token outcome of a multicast send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SendError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendError {
    pub code: String,
    pub message: String,
}

impl SendResponse {
    pub fn success(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(SendError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Report for a whole multicast, one entry per token in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl From<Vec<SendResponse>> for BatchResponse {
    fn from(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        let failure_count = responses.len() - success_count;
        Self {
            responses,
            success_count,
            failure_count,
        }
    }
}

/// The external push delivery service.
///
/// `send_multicast` addresses every token in one logical operation and
/// returns the service's report as an opaque JSON value. Individual token
/// failures live inside the report; an `Err` means the operation as a whole
/// could not be carried out.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<serde_json::Value, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn name(&self) -> &'static str;
}
