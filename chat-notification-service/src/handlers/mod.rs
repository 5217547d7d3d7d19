//! HTTP handlers for chat-notification-service.
//!
//! `callable` carries the business endpoint; `health` serves the
//! infrastructure probes and the metrics scrape.

pub mod callable;
pub mod health;

pub use callable::send_chat_notification;
pub use health::{health_check, metrics_endpoint, readiness_check};
