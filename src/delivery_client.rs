use std::time::Duration;

use reqwest::{Client, StatusCode, multipart};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{MessageBody, RecipientList};

/// Wire shape of the bulk-send request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTransport {
    /// `{ "message": ..., "recipients": [...] }`, extraction already done here.
    #[default]
    Json,
    /// The raw workbook plus the message as form fields; the service extracts
    /// the addresses itself.
    Multipart,
}

impl DeliveryTransport {
    pub fn requires_workbook(&self) -> bool {
        matches!(self, DeliveryTransport::Multipart)
    }
}

/// The spreadsheet as the operator uploaded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct Campaign {
    pub message: MessageBody,
    pub recipients: RecipientList,
    pub workbook: Option<WorkbookUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub message: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("the delivery service rejected the campaign: {reason}")]
    Rejected { reason: String },
    #[error("the delivery service responded with {status}")]
    Status {
        status: StatusCode,
        reason: Option<String>,
    },
    #[error("couldn't understand the delivery service response, {0}")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("couldn't reach the delivery service, reqwest error {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the multipart transport needs the uploaded workbook")]
    MissingWorkbook,
}

impl DeliveryError {
    /// Text shown to the operator. Service-provided reasons are passed
    /// through verbatim.
    pub fn reason(&self) -> String {
        match self {
            DeliveryError::Rejected { reason } => reason.clone(),
            DeliveryError::Status {
                reason: Some(reason),
                ..
            } => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub struct DeliveryClient {
    http_client: Client,
    base_url: String,
    transport: DeliveryTransport,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    message: &'a str,
    recipients: Vec<&'a str>,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
}

impl DeliveryClient {
    pub fn new(
        base_url: String,
        transport: DeliveryTransport,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            transport,
        })
    }

    pub fn transport(&self) -> DeliveryTransport {
        self.transport
    }

    /// One attempt, never retried. Each attempt carries a fresh
    /// `Idempotency-Key` so the service can drop duplicates.
    #[tracing::instrument(
        name = "Submitting a campaign to the delivery service",
        skip(self, campaign),
        fields(
            recipients = campaign.recipients.len(),
            transport = ?self.transport,
            idempotency_key = tracing::field::Empty
        )
    )]
    pub async fn send_campaign(&self, campaign: &Campaign) -> Result<DeliveryReceipt, DeliveryError> {
        let url = format!("{}/sendemail", self.base_url);
        let idempotency_key = Uuid::new_v4();
        tracing::Span::current().record("idempotency_key", tracing::field::display(&idempotency_key));

        let request = self
            .http_client
            .post(&url)
            .header("Idempotency-Key", idempotency_key.to_string());
        let request = match self.transport {
            DeliveryTransport::Json => request.json(&SendEmailRequest {
                message: campaign.message.as_ref(),
                recipients: campaign.recipients.iter().map(AsRef::as_ref).collect(),
            }),
            DeliveryTransport::Multipart => {
                let workbook = campaign
                    .workbook
                    .as_ref()
                    .ok_or(DeliveryError::MissingWorkbook)?;
                let file = multipart::Part::bytes(workbook.bytes.clone())
                    .file_name(workbook.file_name.clone());
                let form = multipart::Form::new()
                    .part("file", file)
                    .text("msg", campaign.message.as_ref().to_owned());
                request.multipart(form)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<FailureBody>(&body)
                .ok()
                .and_then(|body| body.message);
            return Err(DeliveryError::Status { status, reason });
        }

        let body: SendEmailResponse =
            serde_json::from_slice(&body).map_err(DeliveryError::MalformedResponse)?;
        if body.success {
            Ok(DeliveryReceipt {
                message: body.message,
            })
        } else {
            Err(DeliveryError::Rejected {
                reason: body.message.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }
}
