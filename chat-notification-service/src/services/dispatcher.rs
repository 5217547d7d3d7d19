use std::sync::Arc;

use crate::error::DispatchError;
use crate::models::{
    DispatchOutcome, DispatchPayload, DispatchRequest, DispatchResult, MulticastMessage,
};
use crate::services::metrics::record_dispatch;
use crate::services::providers::PushProvider;

/// Validates chat notification requests and hands them to the push provider.
///
/// Each call is independent. A request is either rejected before the
/// provider is touched, or forwarded in exactly one multicast whose report is
/// returned unchanged. Nothing is retried.
#[derive(Clone)]
pub struct NotificationDispatcher {
    provider: Arc<dyn PushProvider>,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn PushProvider> {
        &self.provider
    }

    /// Entry point for the raw callable `data` value.
    pub async fn dispatch_data(
        &self,
        data: serde_json::Value,
    ) -> Result<DispatchResult, DispatchError> {
        match DispatchPayload::from_value(data) {
            Ok(payload) => self.dispatch(payload).await,
            Err(e) => Err(reject(e)),
        }
    }

    pub async fn dispatch(&self, payload: DispatchPayload) -> Result<DispatchResult, DispatchError> {
        let request = DispatchRequest::try_from(payload).map_err(reject)?;
        self.send(request).await
    }

    #[tracing::instrument(
        skip(self, request),
        fields(provider = self.provider.name(), tokens = request.tokens.len())
    )]
    async fn send(&self, request: DispatchRequest) -> Result<DispatchResult, DispatchError> {
        let message = MulticastMessage::from(request);

        match self.provider.send_multicast(&message).await {
            Ok(report) => {
                record_dispatch(DispatchOutcome::Succeeded);
                tracing::info!("Chat notification dispatched");
                Ok(DispatchResult::delivered(report))
            }
            Err(e) => {
                record_dispatch(DispatchOutcome::Failed);
                tracing::error!(error = %e, "Chat notification delivery failed");
                Err(DispatchError::from(e))
            }
        }
    }
}

fn reject(err: DispatchError) -> DispatchError {
    record_dispatch(DispatchOutcome::Rejected);
    tracing::warn!(error = %err, "Chat notification request rejected");
    err
}
