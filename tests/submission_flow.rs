//! Integration tests for the submission pipeline.
//!
//! Everything runs offline: the record store, the PDF renderer and the mail
//! sender are doubles injected through the config, with atomic call counters
//! so the partial-failure policy can be asserted exactly — which stages ran,
//! which were skipped, and what crossed each boundary.

use async_trait::async_trait;
use relocation_intake::pipeline::record::ExternalRecord;
use relocation_intake::{
    handle_submit, render_document, submit, DocumentError, IntakeConfig, IntakeError, MailSender,
    NormalizedSubmission, PageOptions, PdfRenderer, RawSubmission, RecordStore, RenderedDocument,
    StoreError,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeStore {
    create_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_create: bool,
    fail_upload: bool,
    fail_update: bool,
    last_record: Mutex<Option<ExternalRecord>>,
    last_patch: Mutex<Option<ExternalRecord>>,
    last_upload: Mutex<Option<(String, String)>>, // (file name, mime)
}

impl FakeStore {
    fn created(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
    fn uploaded(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
    fn updated(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn create_record(&self, record: &ExternalRecord) -> Result<String, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(StoreError::Rejected {
                status: 520,
                body: "field validation failed".into(),
            });
        }
        *self.last_record.lock().unwrap() = Some(record.clone());
        Ok("101".to_string())
    }

    async fn update_record(
        &self,
        _record_id: &str,
        patch: &ExternalRecord,
    ) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(StoreError::Transport("connection reset".into()));
        }
        *self.last_patch.lock().unwrap() = Some(patch.clone());
        Ok(())
    }

    async fn upload_attachment(
        &self,
        _bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, StoreError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload {
            return Err(StoreError::Rejected {
                status: 413,
                body: "too large".into(),
            });
        }
        *self.last_upload.lock().unwrap() = Some((file_name.to_string(), mime_type.to_string()));
        Ok("key-1".to_string())
    }
}

#[derive(Default)]
struct FakeRenderer {
    calls: AtomicUsize,
    fail: bool,
    last_html: Mutex<Option<String>>,
}

impl FakeRenderer {
    fn rendered(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(&self, html: &str, _options: &PageOptions) -> Result<Vec<u8>, DocumentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DocumentError::Render {
                detail: "browser did not start".into(),
            });
        }
        *self.last_html.lock().unwrap() = Some(html.to_string());
        Ok(b"%PDF-1.4 fake".to_vec())
    }
}

#[derive(Default)]
struct FakeMailer {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl MailSender for FakeMailer {
    async fn send(
        &self,
        _document: &RenderedDocument,
        _submission: &NormalizedSubmission,
    ) -> Result<(), DocumentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DocumentError::Mail {
                detail: "550 relay denied".into(),
            });
        }
        Ok(())
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────

fn raw(v: serde_json::Value) -> RawSubmission {
    serde_json::from_value(v).expect("test input must be a JSON object")
}

fn config_with(
    store: &Arc<FakeStore>,
    renderer: &Arc<FakeRenderer>,
    enable_pdf: bool,
) -> IntakeConfig {
    IntakeConfig::builder()
        .store_base_url("https://example.cybozu.com")
        .store_api_token("test-token")
        .store_app_id("12")
        .enable_pdf(enable_pdf)
        .store(Arc::clone(store) as Arc<dyn RecordStore>)
        .renderer(Arc::clone(renderer) as Arc<dyn PdfRenderer>)
        .build()
}

// ── Record-only path ─────────────────────────────────────────────────────

#[tokio::test]
async fn record_only_submission_never_touches_the_renderer() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, false);

    let result = submit(&raw(json!({"lastName": "山田"})), &config)
        .await
        .expect("submission should succeed");

    assert_eq!(result.record_id, "101");
    assert!(!result.pdf_generated);
    assert_eq!(result.pdf_file_key, None);
    assert_eq!(store.created(), 1);
    assert_eq!(renderer.rendered(), 0);
    assert_eq!(store.uploaded(), 0);
}

// ── Full pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn full_pipeline_attaches_the_document() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let result = submit(
        &raw(json!({"lastName": "山田", "firstName": "太郎"})),
        &config,
    )
    .await
    .expect("submission should succeed");

    assert_eq!(result.record_id, "101");
    assert!(result.pdf_generated);
    assert_eq!(result.pdf_file_key.as_deref(), Some("key-1"));

    assert_eq!(store.created(), 1);
    assert_eq!(renderer.rendered(), 1);
    assert_eq!(store.uploaded(), 1);
    assert_eq!(store.updated(), 1);

    // Upload metadata: derived file name + PDF mime type.
    let (file_name, mime) = store.last_upload.lock().unwrap().clone().unwrap();
    assert!(
        file_name.starts_with("移住相談_山田太郎_"),
        "got: {file_name}"
    );
    assert!(file_name.ends_with(".pdf"));
    assert_eq!(mime, "application/pdf");

    // The record update points the attachment field at the uploaded file.
    let patch = store.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(
        patch["PDFファイル"],
        json!({"value": [{"fileKey": "key-1"}]})
    );
}

// ── Partial-failure policy ───────────────────────────────────────────────

#[tokio::test]
async fn record_failure_is_fatal_and_skips_the_document_stage() {
    let store = Arc::new(FakeStore {
        fail_create: true,
        ..Default::default()
    });
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let err = submit(&raw(json!({"lastName": "山田"})), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::RecordStore { .. }));
    assert_eq!(store.created(), 1);
    // Nothing downstream may run once record creation fails.
    assert_eq!(renderer.rendered(), 0);
    assert_eq!(store.uploaded(), 0);
    assert_eq!(store.updated(), 0);
}

#[tokio::test]
async fn render_failure_degrades_without_undoing_the_record() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer {
        fail: true,
        ..Default::default()
    });
    let config = config_with(&store, &renderer, true);

    let result = submit(&raw(json!({"lastName": "山田"})), &config)
        .await
        .expect("record must survive a render failure");

    assert_eq!(result.record_id, "101");
    assert!(!result.pdf_generated);
    assert_eq!(result.pdf_file_key, None);
    assert_eq!(renderer.rendered(), 1);
    // No upload or attach after a failed render.
    assert_eq!(store.uploaded(), 0);
    assert_eq!(store.updated(), 0);
}

#[tokio::test]
async fn upload_failure_degrades_without_an_attach_call() {
    let store = Arc::new(FakeStore {
        fail_upload: true,
        ..Default::default()
    });
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let result = submit(&raw(json!({"lastName": "山田"})), &config)
        .await
        .expect("record must survive an upload failure");

    assert!(!result.pdf_generated);
    assert_eq!(store.uploaded(), 1);
    assert_eq!(store.updated(), 0);
}

#[tokio::test]
async fn attach_failure_degrades_after_a_successful_upload() {
    let store = Arc::new(FakeStore {
        fail_update: true,
        ..Default::default()
    });
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let result = submit(&raw(json!({"lastName": "山田"})), &config)
        .await
        .expect("record must survive an attach failure");

    assert!(!result.pdf_generated);
    assert_eq!(result.pdf_file_key, None);
    assert_eq!(store.uploaded(), 1);
    assert_eq!(store.updated(), 1);
}

// ── End-to-end (spec'd example submission) ───────────────────────────────

#[tokio::test]
async fn family_and_pet_rules_flow_through_both_projections() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let result = submit(
        &raw(json!({
            "lastName": "山田", "firstName": "太郎",
            "familyLastName1": "山田", "familyFirstName1": "花子",
            "familyRelationship1": "配偶者",
            "hasPet": "no",
        })),
        &config,
    )
    .await
    .expect("submission should succeed");

    assert!(result.pdf_generated);
    assert_eq!(store.created(), 1);

    // Record projection: exactly one family row, for 花子.
    let record = store.last_record.lock().unwrap().clone().unwrap();
    let rows = record["家族"]["value"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["value"]["家族名"]["value"], "花子");
    assert_eq!(rows[0]["value"]["続柄"]["value"], "配偶者");

    // Markup projection: one-row family table, pet subsection omitted.
    let html = renderer.last_html.lock().unwrap().clone().unwrap();
    assert!(html.contains("家族構成"));
    assert!(html.contains("<td>山田 花子</td>"));
    assert!(!html.contains("ペット種類"));
}

#[tokio::test]
async fn checklist_values_join_in_the_stored_record() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, false);

    submit(&raw(json!({"area": ["A", "B"]})), &config)
        .await
        .expect("submission should succeed");

    let record = store.last_record.lock().unwrap().clone().unwrap();
    assert_eq!(record["希望地域"], json!({"value": "A, B"}));
}

// ── Standalone document endpoint ─────────────────────────────────────────

#[tokio::test]
async fn render_document_mails_best_effort() {
    let renderer = Arc::new(FakeRenderer::default());
    let mailer = Arc::new(FakeMailer::default());
    let config = IntakeConfig::builder()
        .renderer(Arc::clone(&renderer) as Arc<dyn PdfRenderer>)
        .mailer(Arc::clone(&mailer) as Arc<dyn MailSender>)
        .build();

    let document = render_document(
        &raw(json!({"lastName": "山田", "firstName": "太郎"})),
        &config,
    )
    .await
    .expect("render should succeed");

    assert!(document.file_name.starts_with("移住相談_山田太郎_"));
    assert_eq!(document.bytes, b"%PDF-1.4 fake");
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mail_failure_does_not_fail_the_document_request() {
    let renderer = Arc::new(FakeRenderer::default());
    let mailer = Arc::new(FakeMailer {
        fail: true,
        ..Default::default()
    });
    let config = IntakeConfig::builder()
        .renderer(Arc::clone(&renderer) as Arc<dyn PdfRenderer>)
        .mailer(Arc::clone(&mailer) as Arc<dyn MailSender>)
        .build();

    let document = render_document(&raw(json!({"lastName": "山田"})), &config)
        .await
        .expect("mail is best-effort");

    assert!(!document.bytes.is_empty());
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn render_failure_is_fatal_on_the_standalone_path() {
    let renderer = Arc::new(FakeRenderer {
        fail: true,
        ..Default::default()
    });
    let config = IntakeConfig::builder()
        .renderer(Arc::clone(&renderer) as Arc<dyn PdfRenderer>)
        .build();

    let err = render_document(&raw(json!({})), &config).await.unwrap_err();
    assert!(matches!(err, IntakeError::Render(_)));
}

// ── Handler wire contract ────────────────────────────────────────────────

#[tokio::test]
async fn handler_reports_success_with_record_id_and_pdf_flag() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let body = json!({"lastName": "山田", "firstName": "太郎"}).to_string();
    let response = handle_submit("POST", &body, &config).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["recordId"], "101");
    assert_eq!(response.body["pdfGenerated"], true);
    assert_eq!(response.body["pdfFileKey"], "key-1");
}

#[tokio::test]
async fn handler_reports_degraded_pdf_as_success() {
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer {
        fail: true,
        ..Default::default()
    });
    let config = config_with(&store, &renderer, true);

    let response = handle_submit("POST", r#"{"lastName":"山田"}"#, &config).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["pdfGenerated"], false);
    // Degraded, not errored: no error key on a successful response.
    assert!(response.body.get("error").is_none());
}

#[tokio::test]
async fn handler_maps_record_failure_to_500() {
    let store = Arc::new(FakeStore {
        fail_create: true,
        ..Default::default()
    });
    let renderer = Arc::new(FakeRenderer::default());
    let config = config_with(&store, &renderer, true);

    let response = handle_submit("POST", r#"{"lastName":"山田"}"#, &config).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "フォームの送信に失敗しました");
    assert!(response.body["error"].as_str().unwrap().contains("520"));
}
