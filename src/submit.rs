//! Submission orchestration: one intake request, start to finish.
//!
//! ## The partial-failure policy
//!
//! The pipeline is linear — validate config, normalize, create the record,
//! then render/upload/attach the PDF — but its failure handling is
//! deliberately asymmetric:
//!
//! * **Before the record exists**, any failure is fatal. A missing API token
//!   or a rejected record surfaces as `Err(IntakeError)` and nothing
//!   downstream runs.
//! * **After the record exists**, every failure is absorbed. The record is
//!   what the consulting office works from; the PDF is a convenience
//!   artifact. A broken browser or a failed upload logs a warning, sets
//!   `pdf_generated = false`, and the request still succeeds.
//!
//! Do not "fix" this to all-or-nothing: rolling back a committed record
//! because a PDF failed would throw away the one durable deliverable.
//!
//! ## Capabilities
//!
//! The record store, renderer and mail sender are resolved from the config's
//! `Arc<dyn …>` slots with production fallbacks, so a host (or a test)
//! injects exactly as much as it needs and relies on defaults for the rest.

use chrono::Local;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::IntakeConfig;
use crate::error::{DocumentError, IntakeError};
use crate::mail::MailSender;
use crate::pipeline::markup::build_markup;
use crate::pipeline::normalize::normalize;
use crate::pipeline::record::{attachment_patch, build_record};
use crate::render::{document_file_name, ChromiumRenderer, PageOptions, PdfRenderer, RenderedDocument};
use crate::store::{KintoneClient, RecordStore};
use crate::submission::{NormalizedSubmission, RawSubmission};

/// MIME type of the uploaded document.
const PDF_MIME: &str = "application/pdf";

/// The aggregate outcome of one submission.
///
/// `record_id` is always set — a result only exists once the record is
/// durably created. The two document fields reflect the optional stage:
/// `pdf_file_key` is present iff the rendered PDF was uploaded *and* the
/// record now references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub record_id: String,
    pub pdf_generated: bool,
    pub pdf_file_key: Option<String>,
}

/// Run one full submission.
///
/// # Errors
/// Fatal only: missing configuration (before any network call) or a
/// record-store rejection. Document-stage failures degrade the result
/// instead of erroring — see the module docs.
pub async fn submit(
    raw: &RawSubmission,
    config: &IntakeConfig,
) -> Result<SubmissionResult, IntakeError> {
    // ── Stage 1: Validate configuration ──────────────────────────────────
    config.validate()?;

    // ── Stage 2: Normalize ───────────────────────────────────────────────
    let submission = normalize(raw);
    info!(
        "Submission received: applicant={}, family_members={}",
        submission.applicant_name(),
        submission.family.len()
    );

    // ── Stage 3: Create the record (fatal on failure) ────────────────────
    let store = resolve_store(config);
    let record = build_record(&submission);
    let record_id =
        store
            .create_record(&record)
            .await
            .map_err(|e| IntakeError::RecordStore {
                detail: e.to_string(),
            })?;
    info!("Record {record_id} created");

    // ── Stage 4: Render & attach (optional, never fatal) ─────────────────
    let mut pdf_generated = false;
    let mut pdf_file_key = None;
    if config.enable_pdf {
        match attach_document(&submission, &record_id, store.as_ref(), config).await {
            Ok(file_key) => {
                info!("Document attached to record {record_id} (fileKey={file_key})");
                pdf_generated = true;
                pdf_file_key = Some(file_key);
            }
            Err(e) => {
                // The record is committed; degrade rather than undo it.
                warn!("Document stage failed for record {record_id}, continuing without PDF: {e}");
            }
        }
    } else {
        debug!("Document stage disabled; record-only submission");
    }

    // ── Stage 5: Completed ───────────────────────────────────────────────
    Ok(SubmissionResult {
        record_id,
        pdf_generated,
        pdf_file_key,
    })
}

/// Render the submission document without touching the record store.
///
/// This is the standalone document endpoint's path: here a render failure
/// *is* fatal (the PDF is the whole point), while the notification mail
/// stays best-effort.
pub async fn render_document(
    raw: &RawSubmission,
    config: &IntakeConfig,
) -> Result<RenderedDocument, IntakeError> {
    let submission = normalize(raw);
    let document = render_submission(&submission, config).await?;

    if let Some(mailer) = resolve_mailer(config) {
        if let Err(e) = mailer.send(&document, &submission).await {
            warn!("Notification mail failed, returning document anyway: {e}");
        }
    }

    Ok(document)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Render, upload, and point the record at the uploaded file.
///
/// Returns the attachment file key. Every failure maps to the
/// [`DocumentError`] variant naming the sub-stage that died, so the warn
/// log tells operators whether to look at the browser, the upload, or the
/// record update.
async fn attach_document(
    submission: &NormalizedSubmission,
    record_id: &str,
    store: &dyn RecordStore,
    config: &IntakeConfig,
) -> Result<String, DocumentError> {
    let document = render_submission(submission, config).await?;

    let file_key = store
        .upload_attachment(document.bytes, &document.file_name, PDF_MIME)
        .await
        .map_err(|e| DocumentError::Upload {
            detail: e.to_string(),
        })?;

    store
        .update_record(record_id, &attachment_patch(&file_key))
        .await
        .map_err(|e| DocumentError::Attach {
            record_id: record_id.to_string(),
            detail: e.to_string(),
        })?;

    Ok(file_key)
}

/// Build markup and rasterise it; shared by both pipelines.
async fn render_submission(
    submission: &NormalizedSubmission,
    config: &IntakeConfig,
) -> Result<RenderedDocument, DocumentError> {
    let now = Local::now();
    let html = build_markup(submission, now);
    debug!("Markup constructed: {} bytes", html.len());

    let renderer = resolve_renderer(config);
    let bytes = renderer.render(&html, &PageOptions::default()).await?;
    debug!("PDF rendered: {} bytes", bytes.len());

    Ok(RenderedDocument {
        bytes,
        file_name: document_file_name(submission, now.date_naive()),
    })
}

/// Use the injected store if any, else a Kintone client from the config.
fn resolve_store(config: &IntakeConfig) -> Arc<dyn RecordStore> {
    match &config.store {
        Some(store) => Arc::clone(store),
        None => Arc::new(KintoneClient::new(config)),
    }
}

/// Use the injected renderer if any, else headless Chromium.
fn resolve_renderer(config: &IntakeConfig) -> Arc<dyn PdfRenderer> {
    match &config.renderer {
        Some(renderer) => Arc::clone(renderer),
        None => Arc::new(ChromiumRenderer::new()),
    }
}

/// Use the injected mailer if any, else SMTP when configured and compiled
/// in; `None` disables the mail step entirely.
fn resolve_mailer(config: &IntakeConfig) -> Option<Arc<dyn MailSender>> {
    if let Some(mailer) = &config.mailer {
        return Some(Arc::clone(mailer));
    }

    #[cfg(feature = "smtp")]
    if let Some(mail) = &config.mail {
        return Some(Arc::new(crate::mail::SmtpMailer::new(mail.clone())));
    }

    None
}
