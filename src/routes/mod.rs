mod health_check;
mod index;
mod recipients;
mod send;
mod session;

pub use health_check::*;
pub use index::*;
pub use recipients::*;
pub use send::*;
pub use session::*;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body of every failed request, shown to the operator as an alert.
#[derive(Serialize, serde::Deserialize, Debug)]
pub struct FailureBody {
    pub success: bool,
    pub message: String,
}

pub(crate) fn failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(FailureBody {
            success: false,
            message,
        }),
    )
        .into_response()
}
