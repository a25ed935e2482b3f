use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartError,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{SessionError, failure};
use crate::{
    delivery_client::WorkbookUpload,
    dispatcher::DispatchError,
    domain::RecipientEmail,
    extraction::DecodeError,
    startup::AppState,
};

const PREVIEW_LEN: usize = 5;

#[derive(Serialize, serde::Deserialize, Debug)]
pub struct UploadSummary {
    pub total: usize,
    pub preview: Vec<String>,
}

/// Decodes the uploaded workbook and replaces the session's recipients.
/// A workbook that can't be decoded leaves the current list untouched.
#[tracing::instrument(name = "Uploading a recipients workbook", skip(app_state, multipart))]
pub async fn upload_recipients(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadSummary>, RecipientsError> {
    let upload = read_workbook(&mut multipart).await?;

    let extractor = app_state.extractor;
    let (recipients, upload) = tokio::task::spawn_blocking(move || {
        extractor
            .extract(&upload.bytes)
            .map(|recipients| (recipients, upload))
    })
    .await??;

    let summary = UploadSummary {
        total: recipients.len(),
        preview: recipients
            .preview(PREVIEW_LEN)
            .iter()
            .map(RecipientEmail::to_string)
            .collect(),
    };
    app_state
        .dispatcher
        .load_recipients(recipients, Some(upload))
        .await?;

    Ok(Json(summary))
}

async fn read_workbook(multipart: &mut Multipart) -> Result<WorkbookUpload, RecipientsError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("recipients.xlsx").to_owned();
        let bytes = field.bytes().await?;
        tracing::info!(file_name = %file_name, bytes = bytes.len(), "Received workbook");
        return Ok(WorkbookUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(RecipientsError::MissingFile)
}

#[derive(thiserror::Error, Debug)]
pub enum RecipientsError {
    #[error("please upload an Excel file in the `file` field")]
    MissingFile,
    #[error("couldn't read the upload, {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("the extraction task failed, {0}")]
    Extraction(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Session(#[from] DispatchError),
}

impl IntoResponse for RecipientsError {
    fn into_response(self) -> Response {
        match self {
            RecipientsError::Session(e) => SessionError(e).into_response(),
            RecipientsError::Multipart(e) => {
                tracing::error!("{}", e);
                failure(e.status(), e.body_text())
            }
            RecipientsError::Extraction(e) => {
                tracing::error!("{}", e);
                failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "couldn't process the workbook".to_string(),
                )
            }
            e @ (RecipientsError::MissingFile | RecipientsError::Decode(_)) => {
                tracing::error!("{}", e);
                failure(StatusCode::BAD_REQUEST, e.to_string())
            }
        }
    }
}
