//! PDF rendering: turn constructed markup into PDF bytes via headless
//! Chromium.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` drives the browser over a synchronous DevTools
//! connection — launching, navigating and exporting all block the calling
//! thread. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so the async workers never stall behind a render.
//!
//! ## Resource discipline
//!
//! The browser process is acquired fresh per render and owned entirely by
//! the blocking closure; `Browser`'s `Drop` kills the child process, and the
//! markup temp file deletes itself the same way. Every exit path — including
//! a failed navigation or export — releases both, so a misbehaving render
//! can never leak a Chromium process across requests.

use async_trait::async_trait;
use chrono::NaiveDate;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::io::Write;
use tracing::debug;

use crate::error::DocumentError;
use crate::submission::NormalizedSubmission;

/// Millimetres per inch; the DevTools print API takes inches.
const MM_PER_INCH: f64 = 25.4;

/// Page geometry for the exported PDF.
///
/// The default is the intake document's fixed layout: A4 portrait with
/// 20 mm top/bottom and 15 mm left/right margins, background graphics on
/// (the stylesheet paints the table header).
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margin_top_mm: f64,
    pub margin_right_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub print_background: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            paper_width_mm: 210.0,
            paper_height_mm: 297.0,
            margin_top_mm: 20.0,
            margin_right_mm: 15.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 15.0,
            print_background: true,
        }
    }
}

fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// A rendered intake document: PDF bytes plus its derived file name.
///
/// Produced once per submission and never mutated; ownership moves from the
/// renderer to the orchestrator, which discards it or forwards it to the
/// attachment upload.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Derive the attachment file name from the applicant and a date:
/// `移住相談_{姓}{名}_{YYYY-MM-DD}.pdf`.
pub fn document_file_name(s: &NormalizedSubmission, date: NaiveDate) -> String {
    format!(
        "移住相談_{}{}_{}.pdf",
        s.last_name,
        s.first_name,
        date.format("%Y-%m-%d")
    )
}

/// The rendering capability: markup text in, PDF bytes out.
///
/// Implementations own the engine lifecycle; callers never see the browser
/// handle. Substitutable with a double for deterministic tests of the
/// submission pipeline.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, options: &PageOptions) -> Result<Vec<u8>, DocumentError>;
}

/// Production renderer backed by a headless Chromium.
#[derive(Debug, Default)]
pub struct ChromiumRenderer;

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, html: &str, options: &PageOptions) -> Result<Vec<u8>, DocumentError> {
        let html = html.to_string();
        let options = options.clone();

        tokio::task::spawn_blocking(move || render_blocking(&html, &options))
            .await
            .map_err(|e| DocumentError::Render {
                detail: format!("render task panicked: {e}"),
            })?
    }
}

/// Blocking implementation: launch, load, export, release.
fn render_blocking(html: &str, options: &PageOptions) -> Result<Vec<u8>, DocumentError> {
    // Chromium wants a navigable URL, not a string; hand it the markup as a
    // self-deleting temp file.
    let mut file = tempfile::Builder::new()
        .prefix("intake-doc-")
        .suffix(".html")
        .tempfile()
        .map_err(render_err)?;
    file.write_all(html.as_bytes()).map_err(render_err)?;
    file.flush().map_err(render_err)?;
    let url = format!("file://{}", file.path().display());

    let launch = LaunchOptions::default_builder()
        .headless(true)
        .build()
        .map_err(render_err)?;
    let browser = Browser::new(launch).map_err(render_err)?;

    let tab = browser.new_tab().map_err(render_err)?;
    tab.navigate_to(&url).map_err(render_err)?;
    tab.wait_until_navigated().map_err(render_err)?;

    let pdf = tab
        .print_to_pdf(Some(print_options(options)))
        .map_err(render_err)?;

    debug!("Rendered PDF: {} bytes", pdf.len());

    // `browser` and `file` drop here on every path: the Chromium process is
    // killed and the markup file deleted, success or failure alike.
    Ok(pdf)
}

fn print_options(options: &PageOptions) -> PrintToPdfOptions {
    PrintToPdfOptions {
        print_background: Some(options.print_background),
        paper_width: Some(mm_to_inches(options.paper_width_mm)),
        paper_height: Some(mm_to_inches(options.paper_height_mm)),
        margin_top: Some(mm_to_inches(options.margin_top_mm)),
        margin_right: Some(mm_to_inches(options.margin_right_mm)),
        margin_bottom: Some(mm_to_inches(options.margin_bottom_mm)),
        margin_left: Some(mm_to_inches(options.margin_left_mm)),
        ..Default::default()
    }
}

fn render_err(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::Render {
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_options_are_a4_with_fixed_margins() {
        let o = PageOptions::default();
        assert_eq!(o.paper_width_mm, 210.0);
        assert_eq!(o.paper_height_mm, 297.0);
        assert_eq!(o.margin_top_mm, 20.0);
        assert_eq!(o.margin_right_mm, 15.0);
        assert!(o.print_background);
    }

    #[test]
    fn mm_conversion_matches_devtools_units() {
        // A4 width: 210mm ≈ 8.27in
        assert!((mm_to_inches(210.0) - 8.2677).abs() < 1e-3);
        assert!((mm_to_inches(25.4) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn file_name_derives_from_applicant_and_date() {
        let s = NormalizedSubmission {
            last_name: "山田".into(),
            first_name: "太郎".into(),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(document_file_name(&s, date), "移住相談_山田太郎_2024-04-01.pdf");
    }

    #[test]
    fn print_options_forward_geometry_in_inches() {
        let opts = print_options(&PageOptions::default());
        assert_eq!(opts.print_background, Some(true));
        let top = opts.margin_top.unwrap();
        assert!((top - 20.0 / 25.4).abs() < 1e-9);
        assert!(opts.landscape.is_none());
    }
}
