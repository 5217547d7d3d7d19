//! Application startup and lifecycle management.
//!
//! Wires the push provider into the dispatcher and serves the callable
//! endpoint next to the health and metrics probes on a single HTTP port.

use crate::config::DispatcherConfig;
use crate::handlers::{health_check, metrics_endpoint, readiness_check, send_chat_notification};
use crate::services::{initialize_app, MockPushProvider, NotificationDispatcher, PushProvider};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: NotificationDispatcher,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, choosing the push provider from configuration.
    pub async fn build(config: DispatcherConfig) -> Result<Self, AppError> {
        let push_provider: Arc<dyn PushProvider> = if config.fcm.enabled {
            let provider = initialize_app(&config.fcm).map_err(|e| {
                tracing::error!("Failed to initialize FCM provider: {}", e);
                AppError::ConfigError(anyhow::anyhow!(e))
            })?;
            tracing::info!("FCM push provider initialized");
            provider
        } else {
            tracing::info!("FCM provider disabled, using mock push provider");
            Arc::new(MockPushProvider::new())
        };

        Self::build_with_provider(config, push_provider).await
    }

    /// Build the application around an explicit push provider.
    pub async fn build_with_provider(
        config: DispatcherConfig,
        push_provider: Arc<dyn PushProvider>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            dispatcher: NotificationDispatcher::new(push_provider),
        };

        // Port 0 picks a random port, which the tests rely on.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat notification service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, letting in-flight requests finish.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sendChatNotification", post(send_chat_notification))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
