//! The text-extraction boundary.
//!
//! Workers only ever see the [`Extractor`] trait: given a path, return the
//! ordered text units (pages) of the document or an [`ExtractError`]. The
//! default implementation, [`PdfExtractor`], is backed by `lopdf`.
//!
//! Extractors must be callable from several worker threads at once. When an
//! implementation is not, wrap it in [`Serialized`], which turns every call
//! into a critical section. That costs all parallelism in the extraction
//! step.

use parking_lot::Mutex;
use std::path::Path;

/// Why a document could not be turned into text.
///
/// The `Display` output is the diagnostic string reported to the peer.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("could not open file: {reason}")]
    Open { reason: String },

    #[error("could not parse document: {reason}")]
    Parse { reason: String },
}

impl ExtractError {
    pub fn open(reason: impl ToString) -> Self {
        Self::Open {
            reason: reason.to_string(),
        }
    }

    pub fn parse(reason: impl ToString) -> Self {
        Self::Parse {
            reason: reason.to_string(),
        }
    }
}

/// Produces the text of a document, one entry per page in page order.
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

impl<E: Extractor + ?Sized> Extractor for Box<E> {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        (**self).extract(path)
    }
}

impl<E: Extractor + ?Sized> Extractor for std::sync::Arc<E> {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        (**self).extract(path)
    }
}

/// Runs the wrapped extractor under a lock, one call at a time.
#[derive(Debug, Default)]
pub struct Serialized<E> {
    inner: Mutex<E>,
}

impl<E> Serialized<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<E: Extractor> Extractor for Serialized<E> {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        self.inner.lock().extract(path)
    }
}

/// PDF text extraction via `lopdf`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl Extractor for PdfExtractor {
    #[tracing::instrument(level = "trace", skip(self))]
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExtractError::open(format!("{}: {e}", path.display())))?;
        let doc = lopdf::Document::load_mem(&bytes).map_err(ExtractError::parse)?;

        // `get_pages` is keyed by 1-based page number, so iteration is in order.
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let texts = pages
            .iter()
            .map(|&page| match doc.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::trace!("Page {page} of {} has no text: {e}", path.display());
                    String::new()
                }
            })
            .collect::<Vec<_>>();

        tracing::trace!("Extracted {} pages from {}", texts.len(), path.display());
        Ok(texts)
    }
}
