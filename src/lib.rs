//! # relocation-intake
//!
//! Turn a municipal relocation / vacant-house intake form submission into
//! two durable artifacts: a structured record in a Kintone app and a
//! printable PDF document, optionally attached back to that record.
//!
//! ## Why this crate?
//!
//! The intake form posts one flat JSON object per applicant. Inside it hides
//! a repeated sub-entity — family members encoded as `familyLastName1`,
//! `familyAge2`, … — plus checklists that arrive as either strings or
//! arrays. This crate recovers a typed submission from that key space once,
//! then projects it twice: onto the record store's field-code schema and
//! onto printable HTML for the PDF renderer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! raw form JSON
//!  │
//!  ├─ 1. Normalize  typed submission + ordered family sequence
//!  ├─ 2. Record     {"value": …} cells, joined checklists, subtable rows
//!  ├─ 3. Create     POST to the record store (fatal on failure)
//!  ├─ 4. Markup     printable HTML, conditional sections, timestamp
//!  ├─ 5. Render     headless Chromium → A4 PDF bytes
//!  └─ 6. Attach     upload file + point the record at it (best-effort)
//! ```
//!
//! Stages 4–6 are best-effort: once the record is committed, a
//! document failure degrades `pdf_generated` to `false` instead of failing
//! the submission. See [`submit::submit`] for the full policy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relocation_intake::{submit, IntakeConfig, RawSubmission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads KINTONE_BASE_URL / KINTONE_API_TOKEN / KINTONE_APP_ID …
//!     let config = IntakeConfig::from_env();
//!     let raw = RawSubmission::from_json_str(
//!         r#"{"lastName":"山田","firstName":"太郎","hasPet":"no"}"#,
//!     )?;
//!     let result = submit(&raw, &config).await?;
//!     println!("record {} (pdf: {})", result.record_id, result.pdf_generated);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `intake-server` binary (axum + clap + tracing-subscriber) |
//! | `smtp`   | on      | Enables the lettre-backed [`mail::SmtpMailer`] |
//!
//! Disable both when embedding only the pipeline:
//! ```toml
//! relocation-intake = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod handler;
pub mod mail;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod submission;
pub mod submit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IntakeConfig, IntakeConfigBuilder, MailConfig};
pub use error::{DocumentError, IntakeError};
pub use handler::{handle_render, handle_submit, ApiResponse, CORS_HEADERS};
pub use mail::MailSender;
pub use render::{ChromiumRenderer, PageOptions, PdfRenderer, RenderedDocument};
pub use store::{KintoneClient, RecordStore, StoreError};
pub use submission::{FamilyMember, MultiValue, NormalizedSubmission, RawSubmission};
pub use submit::{render_document, submit, SubmissionResult};
