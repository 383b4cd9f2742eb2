//! Submission Client: sends one built payload per user action and reports a
//! tagged outcome. Transport, status and body errors never escape as `Err`;
//! they are logged and folded into `SubmissionOutcome::Failure`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{SubmitError, ValidationError};
use crate::forms::{AttachmentSet, FieldFormState, FormKind};
use crate::payload::{build_job_opening, build_job_seeker, EndpointKind, Payload};
use crate::service_client::SubmissionTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The service accepted the submission. `identifier` is opaque display text.
    Success { identifier: String },
    Failure { reason: String },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success { .. })
    }
}

fn failure_reason(kind: EndpointKind) -> &'static str {
    match kind {
        EndpointKind::JobOpening => "Failed to create job opening.",
        EndpointKind::JobSeeker => "Failed to upload.",
    }
}

pub struct SubmissionClient {
    transport: Arc<dyn SubmissionTransport>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submit future ends, including when
/// it is dropped mid-request.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionClient {
    pub fn new(transport: Arc<dyn SubmissionTransport>) -> Self {
        Self {
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Issues exactly one request carrying `payload` to the endpoint for `kind`.
    pub async fn submit(&self, payload: &Payload, kind: EndpointKind) -> SubmissionOutcome {
        match self.transport.submit(kind, payload).await {
            Ok(response) => {
                info!(
                    "{:?} submission accepted: {} ({})",
                    kind,
                    response.identifier,
                    response.message.as_deref().unwrap_or("no message")
                );
                SubmissionOutcome::Success {
                    identifier: response.identifier,
                }
            }
            Err(e) => {
                error!("{:?} submission failed: {e}", kind);
                SubmissionOutcome::Failure {
                    reason: failure_reason(kind).to_string(),
                }
            }
        }
    }

    /// Validates, builds and submits a job opening.
    pub async fn submit_job_opening(
        &self,
        form: &FieldFormState,
    ) -> Result<SubmissionOutcome, SubmitError> {
        expect_kind(form, FormKind::JobOpening)?;
        form.validate()?;

        let _guard = self.acquire()?;
        let payload = build_job_opening(form);
        Ok(self.submit(&payload, EndpointKind::JobOpening).await)
    }

    /// Validates, builds and submits a job-seeker profile with its files.
    /// A missing resume short-circuits before any request is made.
    pub async fn submit_job_seeker(
        &self,
        form: &FieldFormState,
        attachments: &AttachmentSet,
    ) -> Result<SubmissionOutcome, SubmitError> {
        expect_kind(form, FormKind::JobSeeker)?;
        form.validate()?;
        attachments.validate()?;

        let _guard = self.acquire()?;
        let payload = build_job_seeker(form, attachments);
        Ok(self.submit(&payload, EndpointKind::JobSeeker).await)
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>, SubmitError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.in_flight))
            .map_err(|_| {
                warn!("Submit ignored: previous submission still in flight");
                SubmitError::InFlight
            })
    }
}

fn expect_kind(form: &FieldFormState, expected: FormKind) -> Result<(), ValidationError> {
    if form.kind() == expected {
        Ok(())
    } else {
        Err(ValidationError::WrongFormKind {
            expected,
            actual: form.kind(),
        })
    }
}
