use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::failure;
use crate::{
    dispatcher::{DispatchError, SessionSnapshot},
    startup::AppState,
};

#[derive(Deserialize)]
pub struct MessageForm {
    message: String,
}

pub async fn session_snapshot(State(app_state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(app_state.dispatcher.snapshot().await)
}

#[tracing::instrument(
    name = "Updating the message body",
    skip(form, app_state),
    fields(message_bytes = form.message.len())
)]
pub async fn update_message(
    State(app_state): State<Arc<AppState>>,
    Form(form): Form<MessageForm>,
) -> Result<Json<SessionSnapshot>, SessionError> {
    app_state.dispatcher.set_message(form.message).await?;
    Ok(Json(app_state.dispatcher.snapshot().await))
}

/// A session operation the dispatcher refused or could not complete.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct SessionError(#[from] pub DispatchError);

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self.0);
        let status = match &self.0 {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::SubmissionInProgress
            | DispatchError::SessionBusy
            | DispatchError::Cancelled => StatusCode::CONFLICT,
            DispatchError::Delivery(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match self.0 {
            DispatchError::Delivery(e) => e.reason(),
            other => other.to_string(),
        };
        failure(status, message)
    }
}
