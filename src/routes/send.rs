use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use super::SessionError;
use crate::startup::AppState;

#[derive(Serialize, serde::Deserialize, Debug)]
pub struct SendSummary {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Serialize, serde::Deserialize, Debug)]
pub struct CancelSummary {
    pub cancelled: bool,
}

#[tracing::instrument(name = "Sending the campaign", skip(app_state))]
pub async fn send_campaign(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SendSummary>, SessionError> {
    let receipt = app_state.dispatcher.submit().await?;
    Ok(Json(SendSummary {
        success: true,
        message: receipt.message,
    }))
}

#[tracing::instrument(name = "Cancelling the in-flight campaign", skip(app_state))]
pub async fn cancel_send(State(app_state): State<Arc<AppState>>) -> Json<CancelSummary> {
    Json(CancelSummary {
        cancelled: app_state.dispatcher.cancel().await,
    })
}
