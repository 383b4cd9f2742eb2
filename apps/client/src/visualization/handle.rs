use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

/// Counts handle creations and releases. Shared between a loader and the
/// handles it creates so teardown can be audited.
#[derive(Debug, Default)]
pub struct HandleLedger {
    created: AtomicUsize,
    released: AtomicUsize,
}

impl HandleLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles created and not yet released. `released` is read first so a
    /// concurrent create/release pair cannot push it past `created`.
    pub fn live(&self) -> usize {
        let released = self.released();
        self.created().saturating_sub(released)
    }
}

/// Locally owned copy of a fetched visualization, materialized as a
/// temporary file whose path can be handed to an image viewer.
///
/// Not `Clone`: exactly one owner. Dropping it deletes the file and records
/// the release.
#[derive(Debug)]
pub struct ResourceHandle {
    entity_id: String,
    bytes: Bytes,
    file: NamedTempFile,
    ledger: Arc<HandleLedger>,
}

impl ResourceHandle {
    pub fn create(entity_id: &str, bytes: Bytes, ledger: Arc<HandleLedger>) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("jobmatch-viz-")
            .suffix(extension_for(&bytes))
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        ledger.created.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Created visualization handle for {entity_id} at {}",
            file.path().display()
        );

        Ok(Self {
            entity_id: entity_id.to_string(),
            bytes,
            file,
            ledger,
        })
    }

    /// The identifier this handle was fetched for.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Local locator for the image. Valid only while the handle lives.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
        debug!("Released visualization handle for {}", self.entity_id);
    }
}

/// File suffix from the image's magic bytes; the service does not promise a format.
fn extension_for(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        ".png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ".jpg"
    } else if bytes.starts_with(b"GIF8") {
        ".gif"
    } else if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") {
        ".svg"
    } else {
        ".bin"
    }
}
