use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::DispatchError;

pub const MISSING_FIELDS_MESSAGE: &str =
    "The function must be called with tokens, title, and body.";

/// Field order used when reporting which inputs were rejected.
const REQUIRED_FIELDS: [&str; 3] = ["tokens", "title", "body"];

/// Loosely typed `data` object as it arrives from the caller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DispatchPayload {
    #[validate(required, length(min = 1))]
    pub tokens: Option<Vec<String>>,
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[validate(required, length(min = 1))]
    pub body: Option<String>,
}

impl DispatchPayload {
    /// Interpret the callable `data` value. Anything that is not an object
    /// with correctly typed fields is a caller error.
    pub fn from_value(data: serde_json::Value) -> Result<Self, DispatchError> {
        serde_json::from_value(data).map_err(|e| {
            DispatchError::InvalidArgument(format!("{} ({})", MISSING_FIELDS_MESSAGE, e))
        })
    }
}

/// A request that passed boundary validation; every field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
}

impl TryFrom<DispatchPayload> for DispatchRequest {
    type Error = DispatchError;

    fn try_from(payload: DispatchPayload) -> Result<Self, Self::Error> {
        if let Err(errors) = payload.validate() {
            let field_errors = errors.field_errors();
            let invalid: Vec<&str> = REQUIRED_FIELDS
                .iter()
                .copied()
                .filter(|field| field_errors.contains_key(*field))
                .collect();

            return Err(DispatchError::InvalidArgument(format!(
                "{} (invalid: {})",
                MISSING_FIELDS_MESSAGE,
                invalid.join(", ")
            )));
        }

        match (payload.tokens, payload.title, payload.body) {
            (Some(tokens), Some(title), Some(body)) => Ok(Self {
                tokens,
                title,
                body,
            }),
            _ => Err(DispatchError::InvalidArgument(
                MISSING_FIELDS_MESSAGE.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// One logical send addressed to every token at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub notification: Notification,
}

impl From<DispatchRequest> for MulticastMessage {
    fn from(request: DispatchRequest) -> Self {
        Self {
            tokens: request.tokens,
            notification: Notification {
                title: request.title,
                body: request.body,
            },
        }
    }
}

/// Success payload returned to the caller. `response` is the delivery
/// service's report, untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub response: serde_json::Value,
}

impl DispatchResult {
    pub fn delivered(response: serde_json::Value) -> Self {
        Self {
            success: true,
            response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Succeeded,
    Rejected,
    Failed,
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Succeeded => write!(f, "succeeded"),
            DispatchOutcome::Rejected => write!(f, "rejected"),
            DispatchOutcome::Failed => write!(f, "failed"),
        }
    }
}
