use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use rinja_axum::Template;

use crate::{
    dispatcher::{SessionSnapshot, SubmissionState},
    startup::AppState,
};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    title: String,
    snapshot: SessionSnapshot,
    submitting: bool,
    alert: Option<String>,
}

pub async fn index(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = app_state.dispatcher.snapshot().await;
    let template = IndexTemplate {
        title: String::from("Bulk Mail"),
        submitting: snapshot.state == SubmissionState::Submitting,
        alert: snapshot.last_outcome.as_ref().map(|outcome| outcome.alert()),
        snapshot,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("couldn't render the index page, {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
