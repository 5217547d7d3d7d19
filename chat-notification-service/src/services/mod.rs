pub mod dispatcher;
pub mod metrics;
pub mod providers;

pub use dispatcher::NotificationDispatcher;
pub use metrics::{get_metrics, init_metrics, record_dispatch, record_provider_send};
pub use providers::{
    initialize_app, BatchResponse, FcmProvider, MockPushProvider, ProviderError, PushProvider,
    SendResponse,
};
