use super::{BatchResponse, ProviderError, PushProvider, SendResponse};
use crate::models::MulticastMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

enum MockBehavior {
    Deliver,
    Report(serde_json::Value),
    Fail(String),
}

/// In-process stand-in for the delivery service. Used when FCM is disabled
/// and by tests, which inspect what would have been sent.
pub struct MockPushProvider {
    behavior: MockBehavior,
    message_ids: AtomicU64,
    sent: Mutex<Vec<MulticastMessage>>,
}

impl MockPushProvider {
    /// Accept every token.
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::Deliver)
    }

    /// Return `report` verbatim for every multicast.
    pub fn with_report(report: serde_json::Value) -> Self {
        Self::with_behavior(MockBehavior::Report(report))
    }

    /// Fail every multicast with a connection error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(reason.into()))
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            message_ids: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    pub fn sent_messages(&self) -> Vec<MulticastMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Default for MockPushProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<serde_json::Value, ProviderError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }

        match &self.behavior {
            MockBehavior::Deliver => {
                let responses = message
                    .tokens
                    .iter()
                    .map(|_| {
                        let id = self.message_ids.fetch_add(1, Ordering::SeqCst) + 1;
                        SendResponse::success(format!("mock-push-{}", id))
                    })
                    .collect::<Vec<_>>();

                tracing::info!(
                    tokens = message.tokens.len(),
                    "[MOCK] Multicast push would be sent"
                );

                Ok(serde_json::json!(BatchResponse::from(responses)))
            }
            MockBehavior::Report(report) => Ok(report.clone()),
            MockBehavior::Fail(reason) => Err(ProviderError::Connection(reason.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
