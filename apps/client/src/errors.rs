use thiserror::Error;

use crate::forms::FormKind;

/// Local precondition failures. Raised before any network call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is empty")]
    MissingField { field: &'static str },

    #[error("A resume must be attached before submitting")]
    MissingResume,

    #[error("Expected a {expected} form, got a {actual} form")]
    WrongFormKind { expected: FormKind, actual: FormKind },

    #[error("Unknown field '{field}' for {kind} form")]
    UnknownField { kind: FormKind, field: String },
}

/// Why a submit was refused locally. An `Err(SubmitError)` always means the
/// service was not contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("A submission is already in progress")]
    InFlight,
}

/// Errors at the HTTP boundary with the matching service.
/// Never handed to the presentation layer; converted into
/// `SubmissionOutcome::Failure` or `VisualizationViewState::Error` first.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid service base URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("{key} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { key: &'static str, value: String },
}
