use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    delivery_client::{Campaign, DeliveryClient, DeliveryError, DeliveryReceipt, WorkbookUpload},
    domain::{MessageBody, RecipientEmail, RecipientList},
};

const MESSAGE_PREVIEW_GRAPHEMES: usize = 280;
const RECIPIENTS_PREVIEW_LEN: usize = 5;

/// `Idle -> Submitting -> (Succeeded | Failed) -> Idle`. The two result
/// states are published to observers and then immediately left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Succeeded {
        recipients: usize,
        message: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl SubmissionOutcome {
    pub fn alert(&self) -> String {
        match self {
            SubmissionOutcome::Succeeded { .. } => "✅ Emails sent successfully".to_string(),
            SubmissionOutcome::Failed { reason } => format!("❌ Failed: {}", reason),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter a message")]
    BlankMessage,
    #[error("please upload a workbook with at least one recipient")]
    NoRecipients,
    #[error("the delivery service needs the original workbook, please upload it again")]
    MissingWorkbook,
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in flight")]
    SubmissionInProgress,
    #[error("the session can't change while a submission is in flight")]
    SessionBusy,
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("the submission was cancelled")]
    Cancelled,
}

/// Read-only view of the session for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SubmissionState,
    pub message: String,
    pub message_preview: String,
    /// Grapheme clusters, so an emoji or accented letter counts once.
    pub character_count: usize,
    pub total_recipients: usize,
    pub recipients_preview: Vec<RecipientEmail>,
    pub last_outcome: Option<SubmissionOutcome>,
}

#[derive(Default)]
struct Session {
    message: MessageBody,
    recipients: RecipientList,
    workbook: Option<WorkbookUpload>,
    state: SubmissionState,
    // bumped on every submit and cancel; a result is only applied if its
    // attempt is still current
    attempt: u64,
    last_outcome: Option<SubmissionOutcome>,
}

/// Owns the operator's session and the single in-flight submission.
pub struct Dispatcher {
    session: Mutex<Session>,
    delivery_client: DeliveryClient,
    state_tx: watch::Sender<SubmissionState>,
}

impl Dispatcher {
    pub fn new(delivery_client: DeliveryClient) -> Self {
        let (state_tx, _) = watch::channel(SubmissionState::Idle);
        Self {
            session: Mutex::new(Session::default()),
            delivery_client,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.lock_session();
        SessionSnapshot {
            state: session.state,
            message: session.message.as_ref().to_owned(),
            message_preview: session.message.preview(MESSAGE_PREVIEW_GRAPHEMES),
            character_count: session.message.grapheme_count(),
            total_recipients: session.recipients.len(),
            recipients_preview: session.recipients.preview(RECIPIENTS_PREVIEW_LEN).to_vec(),
            last_outcome: session.last_outcome.clone(),
        }
    }

    pub async fn set_message(&self, message: String) -> Result<(), DispatchError> {
        let mut session = self.lock_session();
        if session.state == SubmissionState::Submitting {
            return Err(DispatchError::SessionBusy);
        }
        session.message = MessageBody::new(message);
        Ok(())
    }

    /// Replaces the recipient list wholesale. The workbook is only kept when
    /// the delivery transport needs to forward it.
    #[tracing::instrument(
        name = "Loading recipients into the session",
        skip(self, recipients, workbook),
        fields(recipients = recipients.len())
    )]
    pub async fn load_recipients(
        &self,
        recipients: RecipientList,
        workbook: Option<WorkbookUpload>,
    ) -> Result<(), DispatchError> {
        let mut session = self.lock_session();
        if session.state == SubmissionState::Submitting {
            return Err(DispatchError::SessionBusy);
        }
        session.recipients = recipients;
        session.workbook = workbook.filter(|_| self.delivery_client.transport().requires_workbook());
        Ok(())
    }

    /// Sends the session's message to the session's recipients.
    ///
    /// The lock is released for the HTTP round trip; the outcome is applied
    /// only if no cancel (or newer submit) happened in the meantime. On
    /// success the message and recipients are cleared, on failure they are
    /// left as they were so the operator can retry. Dropping the returned
    /// future mid-flight has the same effect as [`Dispatcher::cancel`].
    #[tracing::instrument(name = "Dispatching a campaign", skip(self), fields(attempt = tracing::field::Empty))]
    pub async fn submit(&self) -> Result<DeliveryReceipt, DispatchError> {
        let (attempt, campaign) = {
            let mut session = self.lock_session();
            if session.state == SubmissionState::Submitting {
                return Err(DispatchError::SubmissionInProgress);
            }
            self.validate(&session)?;

            session.attempt += 1;
            self.transition(&mut session, SubmissionState::Submitting);
            let campaign = Campaign {
                message: session.message.clone(),
                recipients: session.recipients.clone(),
                workbook: session.workbook.clone(),
            };
            (session.attempt, campaign)
        };
        tracing::Span::current().record("attempt", attempt);
        let mut in_flight = InFlight {
            dispatcher: self,
            attempt,
            settled: false,
        };

        let result = self.delivery_client.send_campaign(&campaign).await;

        in_flight.settled = true;
        let mut session = self.lock_session();
        if session.state != SubmissionState::Submitting || session.attempt != attempt {
            tracing::warn!(attempt, "Discarding the result of a cancelled submission");
            return Err(DispatchError::Cancelled);
        }

        match result {
            Ok(receipt) => {
                session.message = MessageBody::default();
                session.recipients = RecipientList::default();
                session.workbook = None;
                session.last_outcome = Some(SubmissionOutcome::Succeeded {
                    recipients: campaign.recipients.len(),
                    message: receipt.message.clone(),
                });
                self.transition(&mut session, SubmissionState::Succeeded);
                self.transition(&mut session, SubmissionState::Idle);
                tracing::info!(recipients = campaign.recipients.len(), "Campaign accepted");
                Ok(receipt)
            }
            Err(e) => {
                session.last_outcome = Some(SubmissionOutcome::Failed { reason: e.reason() });
                self.transition(&mut session, SubmissionState::Failed);
                self.transition(&mut session, SubmissionState::Idle);
                tracing::error!(error = %e, "Campaign failed");
                Err(e.into())
            }
        }
    }

    /// Abandons the in-flight submission. The HTTP call is left to finish but
    /// its result is thrown away. Returns `false` if nothing was in flight.
    pub async fn cancel(&self) -> bool {
        let mut session = self.lock_session();
        if session.state != SubmissionState::Submitting {
            return false;
        }
        session.attempt += 1;
        self.transition(&mut session, SubmissionState::Idle);
        tracing::info!("Submission cancelled");
        true
    }

    // Every critical section is synchronous, so a poisoned lock still holds a
    // consistent session.
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate(&self, session: &Session) -> Result<(), ValidationError> {
        if session.message.is_blank() {
            return Err(ValidationError::BlankMessage);
        }
        if session.recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }
        if self.delivery_client.transport().requires_workbook() && session.workbook.is_none() {
            return Err(ValidationError::MissingWorkbook);
        }
        Ok(())
    }

    fn transition(&self, session: &mut Session, state: SubmissionState) {
        session.state = state;
        self.state_tx.send_replace(state);
    }
}

/// Returns the session to `Idle` if a `submit` future is dropped mid-flight,
/// e.g. when the HTTP client disconnects. Inputs are left untouched and the
/// attempt is retired so its late result is never applied.
struct InFlight<'a> {
    dispatcher: &'a Dispatcher,
    attempt: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut session = self.dispatcher.lock_session();
        if session.state == SubmissionState::Submitting && session.attempt == self.attempt {
            session.attempt += 1;
            self.dispatcher.transition(&mut session, SubmissionState::Idle);
            tracing::warn!(attempt = self.attempt, "Submission dropped before the delivery service answered");
        }
    }
}
