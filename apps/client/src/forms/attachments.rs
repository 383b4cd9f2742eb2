use std::path::Path;

use bytes::Bytes;

use crate::errors::ValidationError;

/// An opaque user-selected file. Contents are never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: Bytes,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads a file from disk, naming the attachment after the file name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, content))
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Files attached to a job-seeker submission.
///
/// Certificates keep their selection order; removal compacts the sequence so
/// the indices used on the wire never have gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSet {
    resume: Option<Attachment>,
    cover_letter: Option<Attachment>,
    certificates: Vec<Attachment>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resume(&mut self, file: Attachment) {
        self.resume = Some(file);
    }

    pub fn clear_resume(&mut self) -> Option<Attachment> {
        self.resume.take()
    }

    pub fn resume(&self) -> Option<&Attachment> {
        self.resume.as_ref()
    }

    pub fn set_cover_letter(&mut self, file: Attachment) {
        self.cover_letter = Some(file);
    }

    pub fn clear_cover_letter(&mut self) -> Option<Attachment> {
        self.cover_letter.take()
    }

    pub fn cover_letter(&self) -> Option<&Attachment> {
        self.cover_letter.as_ref()
    }

    pub fn add_certificate(&mut self, file: Attachment) {
        self.certificates.push(file);
    }

    /// A fresh multi-file selection replaces the previous one wholesale.
    pub fn replace_certificates(&mut self, files: impl IntoIterator<Item = Attachment>) {
        self.certificates = files.into_iter().collect();
    }

    /// Removes the certificate at `index`, shifting later ones down.
    pub fn remove_certificate(&mut self, index: usize) -> Option<Attachment> {
        (index < self.certificates.len()).then(|| self.certificates.remove(index))
    }

    pub fn certificates(&self) -> &[Attachment] {
        &self.certificates
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.resume {
            Some(_) => Ok(()),
            None => Err(ValidationError::MissingResume),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
