//! Job and result types shared by the dispatcher, the workers and the peer.
//!
//! ## Wire payloads
//!
//! Inbound (job request):
//!
//! ```json
//! { "job_id": "a", "file_path": "/tmp/report.pdf" }
//! ```
//!
//! Outbound (job result), `error` only present when `status` is `Failed`:
//!
//! ```json
//! { "job_id": "a", "text": "...", "status": "Success" }
//! { "job_id": "b", "text": "", "status": "Failed", "error": "..." }
//! ```
//!
//! Payloads are JSON objects; unknown fields are ignored on decode so the peer
//! may add fields without breaking older workers.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Size in bytes of the little-endian length header preceding every payload.
pub const HEADER_SIZE: usize = size_of::<u32>();

/// Default upper bound on an inbound payload (64 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// One unit of requested work.
///
/// The `id` is opaque and echoed back verbatim; uniqueness is the peer's
/// concern. The `path` is not checked for existence before it is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    #[serde(rename = "file_path")]
    pub path: String,
}

impl Job {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Decodes a job request payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedPayload`] on invalid JSON, invalid
    /// UTF-8, or a missing/mistyped `job_id` or `file_path`.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Terminal state of a processed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Success,
    Failed,
}

/// What processing a job produced.
///
/// Keeping the error inside the `Failed` variant means a successful result can
/// never carry an error and a failed one always does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { text: String },
    Failed { error: String },
}

/// The outcome of one job, correlated to it by `job_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: String,
    pub outcome: Outcome,
}

impl JobResult {
    pub fn success(job_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            outcome: Outcome::Success { text: text.into() },
        }
    }

    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            outcome: Outcome::Failed {
                error: error.into(),
            },
        }
    }

    pub const fn status(&self) -> JobStatus {
        match self.outcome {
            Outcome::Success { .. } => JobStatus::Success,
            Outcome::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Extracted text; always empty for a failed job.
    pub fn text(&self) -> &str {
        match &self.outcome {
            Outcome::Success { text } => text,
            Outcome::Failed { .. } => "",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failed { error } => Some(error),
        }
    }

    /// Encodes this result as an outbound payload.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let wire = ResultWire {
            job_id: &self.job_id,
            text: self.text(),
            status: self.status(),
            error: self.error(),
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Decodes an outbound payload. Used by the peer side and in tests.
    ///
    /// A `Failed` payload without an `error` field decodes with an empty
    /// error; an `error` on a `Success` payload is ignored.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let wire: OwnedResultWire = serde_json::from_slice(payload)?;
        Ok(match wire.status {
            JobStatus::Success => Self::success(wire.job_id, wire.text),
            JobStatus::Failed => Self::failed(wire.job_id, wire.error.unwrap_or_default()),
        })
    }
}

#[derive(Serialize)]
struct ResultWire<'a> {
    job_id: &'a str,
    text: &'a str,
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct OwnedResultWire {
    job_id: String,
    #[serde(default)]
    text: String,
    status: JobStatus,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::Value;

    #[test]
    fn job_decodes_and_ignores_unknown_fields() {
        let job = Job::from_payload(br#"{"job_id":"a","file_path":"x.pdf","priority":3}"#)
            .expect("valid payload");
        assert_eq!(job, Job::new("a", "x.pdf"));
    }

    #[test]
    fn job_missing_field_is_malformed() {
        let err = Job::from_payload(br#"{"job_id":"a"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn job_wrong_type_is_malformed() {
        let err = Job::from_payload(br#"{"job_id":7,"file_path":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn job_invalid_syntax_is_malformed() {
        let err = Job::from_payload(b"{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn success_payload_omits_error_key() {
        let payload = JobResult::success("a", "hello").to_payload().unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["job_id"], "a");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["status"], "Success");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failed_payload_carries_error_and_empty_text() {
        let payload = JobResult::failed("b", "could not open").to_payload().unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["status"], "Failed");
        assert_eq!(value["text"], "");
        assert_eq!(value["error"], "could not open");
    }

    #[test]
    fn result_payload_preserves_unicode_text() {
        let text = "naïve café \u{1F600} 日本語 \u{10FFFF} \"quoted\"\n\ttab";
        let result = JobResult::success("u", text);
        let decoded = JobResult::from_payload(&result.to_payload().unwrap()).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn status_and_error_agree() {
        let ok = JobResult::success("a", "");
        assert_eq!(ok.status(), JobStatus::Success);
        assert_eq!(ok.error(), None);

        let failed = JobResult::failed("b", "boom");
        assert_eq!(failed.status(), JobStatus::Failed);
        assert_eq!(failed.error(), Some("boom"));
        assert_eq!(failed.text(), "");
    }
}
