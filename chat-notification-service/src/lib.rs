//! chat-notification-service: a callable function that validates chat
//! notifications and sends them to device tokens as one FCM multicast.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use error::DispatchError;
