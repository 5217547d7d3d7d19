use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::models::DispatchResult;
use crate::startup::AppState;

/// Request envelope of a callable function: the arguments live under `data`.
#[derive(Debug, Deserialize)]
pub struct CallableRequest {
    pub data: serde_json::Value,
}

/// Response envelope of a callable function.
#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

/// `POST /sendChatNotification`
#[tracing::instrument(skip(state, request))]
pub async fn send_chat_notification(
    State(state): State<AppState>,
    request: Result<Json<CallableRequest>, JsonRejection>,
) -> Result<Json<CallableResponse<DispatchResult>>, DispatchError> {
    let Json(request) = request?;

    let result = state.dispatcher.dispatch_data(request.data).await?;

    Ok(Json(CallableResponse { result }))
}
