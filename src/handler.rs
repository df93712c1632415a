//! Request handlers: the HTTP-facing contract, host-framework agnostic.
//!
//! Each handler takes the request method and raw body and returns an
//! [`ApiResponse`] — a status code plus a JSON body — so the same logic
//! serves an axum route, a serverless function adapter, or a test calling
//! it directly. The contract per endpoint:
//!
//! * `OPTIONS` — answered 200 with an empty body (cross-origin preflight);
//! * any method other than `POST` — 405 `{"error":"Method not allowed"}`;
//! * `POST` — 200 with `{success: true, …}` on success, 500 with
//!   `{success: false, message, error}` on any fatal error.
//!
//! Fatal errors keep the user-facing message generic; the detail string is
//! for the office's logs, not for form visitors.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::submission::RawSubmission;
use crate::submit::{render_document, submit, SubmissionResult};

/// CORS headers attached to every response, preflight included.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

/// A framework-agnostic response: status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn method_not_allowed() -> Self {
        Self {
            status: 405,
            body: json!({ "error": "Method not allowed" }),
        }
    }

    fn failure(message: &str, err: &IntakeError) -> Self {
        Self {
            status: 500,
            body: json!({
                "success": false,
                "message": message,
                "error": err.to_string(),
            }),
        }
    }
}

/// Successful submit response, serialized camelCase for the form client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitOk {
    success: bool,
    message: &'static str,
    record_id: String,
    pdf_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pdf_file_key: Option<String>,
}

impl From<SubmissionResult> for SubmitOk {
    fn from(result: SubmissionResult) -> Self {
        Self {
            success: true,
            message: "フォームの送信が完了しました",
            record_id: result.record_id,
            pdf_generated: result.pdf_generated,
            pdf_file_key: result.pdf_file_key,
        }
    }
}

/// Handle a form submission request (record + optional document).
pub async fn handle_submit(method: &str, body: &str, config: &IntakeConfig) -> ApiResponse {
    if let Some(early) = answer_non_post(method) {
        return early;
    }

    let outcome = async {
        let raw = RawSubmission::from_json_str(body)?;
        submit(&raw, config).await
    }
    .await;

    match outcome {
        Ok(result) => ApiResponse::ok(
            serde_json::to_value(SubmitOk::from(result)).unwrap_or_else(|_| json!({})),
        ),
        Err(e) => {
            error!("Submission failed: {e}");
            ApiResponse::failure("フォームの送信に失敗しました", &e)
        }
    }
}

/// Handle a standalone document request: render (and mail) the PDF and
/// return it base64-encoded for client-side download.
pub async fn handle_render(method: &str, body: &str, config: &IntakeConfig) -> ApiResponse {
    if let Some(early) = answer_non_post(method) {
        return early;
    }

    let outcome = async {
        let raw = RawSubmission::from_json_str(body)?;
        render_document(&raw, config).await
    }
    .await;

    match outcome {
        Ok(document) => {
            use base64::engine::general_purpose::STANDARD;
            use base64::Engine as _;
            ApiResponse::ok(json!({
                "success": true,
                "message": "PDFが生成されました",
                "pdf": STANDARD.encode(&document.bytes),
                "size": document.bytes.len(),
                "fileName": document.file_name,
            }))
        }
        Err(e) => {
            error!("Document generation failed: {e}");
            ApiResponse::failure("PDF生成に失敗しました", &e)
        }
    }
}

/// Preflight and method gating shared by both endpoints.
fn answer_non_post(method: &str) -> Option<ApiResponse> {
    if method.eq_ignore_ascii_case("OPTIONS") {
        return Some(ApiResponse::ok(Value::Null));
    }
    if !method.eq_ignore_ascii_case("POST") {
        return Some(ApiResponse::method_not_allowed());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn options_preflight_is_answered_empty() {
        let response = handle_submit("OPTIONS", "", &IntakeConfig::default()).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Value::Null);
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let response = handle_submit(method, "", &IntakeConfig::default()).await;
            assert_eq!(response.status, 405, "method {method}");
            assert_eq!(response.body["error"], "Method not allowed");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_fatal_500() {
        let config = IntakeConfig::builder()
            .store_base_url("https://example.cybozu.com")
            .store_api_token("t")
            .store_app_id("1")
            .build();

        let response = handle_submit("POST", "not json", &config).await;
        assert_eq!(response.status, 500);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["message"], "フォームの送信に失敗しました");
    }

    #[tokio::test]
    async fn missing_config_is_a_fatal_500() {
        let response = handle_submit("POST", "{}", &IntakeConfig::default()).await;
        assert_eq!(response.status, 500);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("KINTONE_BASE_URL"));
    }
}
