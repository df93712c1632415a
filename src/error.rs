//! Error types for the relocation-intake library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IntakeError`] — **Fatal**: the submission cannot proceed at all
//!   (missing store credentials, malformed request body, the record store
//!   rejected record creation). Returned as `Err(IntakeError)` from the
//!   top-level `submit` / `render_document` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: the document stage failed (browser
//!   launch, attachment upload, record update, mail delivery) *after* the
//!   record was already durably created. Caught inside the orchestrator and
//!   degraded to `pdf_generated = false` so callers never lose a committed
//!   record to a convenience artifact.
//!
//! The separation encodes the submission priority: the record is the primary
//! deliverable, the PDF is best-effort. Anything that would fail the request
//! *before* the record exists is an `IntakeError`; anything after is a
//! `DocumentError`.

use thiserror::Error;

/// All fatal errors returned by the relocation-intake library.
///
/// Document-stage failures after record creation use [`DocumentError`] and
/// are absorbed into [`crate::submit::SubmissionResult::pdf_generated`]
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required environment setting is absent or empty.
    ///
    /// Checked before any network call so a misconfigured deployment fails
    /// fast instead of half-submitting.
    #[error("Missing required configuration: {name}\nSet the {name} environment variable.")]
    MissingConfig { name: &'static str },

    // ── Request errors ────────────────────────────────────────────────────
    /// The request body was not a JSON object.
    #[error("Invalid request body: {detail}")]
    InvalidBody { detail: String },

    // ── Record-store errors ───────────────────────────────────────────────
    /// The record store rejected record creation. Fatal: nothing downstream
    /// runs, and the caller is told the submission failed.
    #[error("Record store rejected the submission: {detail}")]
    RecordStore { detail: String },

    // ── Document errors (fatal only on the standalone document path) ──────
    /// Rendering failed on the standalone document endpoint, where the PDF
    /// is the whole point of the request.
    #[error("Document rendering failed: {0}")]
    Render(#[from] DocumentError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error in the document stage of a submission.
///
/// The orchestrator catches these after the record is created, logs them,
/// and returns success with `pdf_generated = false`.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// The rendering engine failed to launch, load the markup, or export.
    #[error("PDF rendering failed: {detail}")]
    Render { detail: String },

    /// The attachment upload to the record store failed after a successful
    /// render.
    #[error("Attachment upload failed: {detail}")]
    Upload { detail: String },

    /// The record update referencing the uploaded attachment failed.
    #[error("Attaching the document to record {record_id} failed: {detail}")]
    Attach { record_id: String, detail: String },

    /// SMTP delivery of the notification mail failed.
    #[error("Mail notification failed: {detail}")]
    Mail { detail: String },
}
