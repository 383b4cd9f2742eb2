//! Payload Builder: merges form fields and attachments into the body sent to
//! the matching service.
//!
//! Pure transformation. Required-field checks happen before the builder is
//! invoked (see `SubmissionClient`); the builder never fails.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::forms::{AttachmentSet, FieldFormState};

pub const RESUME_KEY: &str = "resume";
pub const COVER_LETTER_KEY: &str = "cover_letter";

/// Multipart key for the certificate at `index`.
pub fn certificate_key(index: usize) -> String {
    format!("certificates[{index}]")
}

/// Which service endpoint a payload is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    JobOpening,
    JobSeeker,
}

impl EndpointKind {
    /// Response field carrying the service-assigned identifier.
    pub fn identifier_field(self) -> &'static str {
        match self {
            EndpointKind::JobOpening => "job_id",
            EndpointKind::JobSeeker => "seeker_id",
        }
    }
}

/// A binary part of a multipart payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub key: String,
    pub file_name: String,
    pub content: Bytes,
}

/// Text fields and files for a `multipart/form-data` body, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    pub text: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartPayload {
    pub fn text_value(&self, key: &str) -> Option<&str> {
        self.text
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn file(&self, key: &str) -> Option<&FilePart> {
        self.files.iter().find(|f| f.key == key)
    }

    /// Certificate parts, in index order.
    pub fn certificates(&self) -> impl Iterator<Item = &FilePart> {
        self.files
            .iter()
            .filter(|f| f.key.starts_with("certificates["))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Flat field-name → value mapping, sent as JSON.
    Fields(BTreeMap<String, String>),
    /// Text fields plus files, sent as `multipart/form-data`.
    Multipart(MultipartPayload),
}

/// Text-only payload for job-opening creation. Every field is included verbatim.
pub fn build_job_opening(form: &FieldFormState) -> Payload {
    let fields = form
        .entries()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    Payload::Fields(fields)
}

/// Multipart payload for a job-seeker upload.
///
/// Text fields come first, then the resume, the cover letter when present,
/// and each certificate under `certificates[i]` in selection order.
pub fn build_job_seeker(form: &FieldFormState, attachments: &AttachmentSet) -> Payload {
    let text = form
        .entries()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let mut files = Vec::with_capacity(2 + attachments.certificates().len());
    if let Some(resume) = attachments.resume() {
        files.push(FilePart {
            key: RESUME_KEY.to_string(),
            file_name: resume.name.clone(),
            content: resume.content.clone(),
        });
    }
    if let Some(letter) = attachments.cover_letter() {
        files.push(FilePart {
            key: COVER_LETTER_KEY.to_string(),
            file_name: letter.name.clone(),
            content: letter.content.clone(),
        });
    }
    for (index, cert) in attachments.certificates().iter().enumerate() {
        files.push(FilePart {
            key: certificate_key(index),
            file_name: cert.name.clone(),
            content: cert.content.clone(),
        });
    }

    Payload::Multipart(MultipartPayload { text, files })
}
