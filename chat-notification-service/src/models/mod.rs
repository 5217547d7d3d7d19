pub mod dispatch;

pub use dispatch::{
    DispatchOutcome, DispatchPayload, DispatchRequest, DispatchResult, MulticastMessage,
    Notification, MISSING_FIELDS_MESSAGE,
};
