//! Record store: the external structured-data service holding one record
//! per submission.
//!
//! The capability is the three calls the pipeline needs — create a record,
//! update it, upload a file — behind [`RecordStore`] so the orchestrator
//! can be tested against a double with call counters instead of a live
//! deployment. [`KintoneClient`] is the production implementation, speaking
//! Kintone's REST surface over `reqwest`.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::IntakeConfig;
use crate::pipeline::record::ExternalRecord;

/// A failed remote call, in either of the two ways a REST store fails.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The request never completed (DNS, TLS, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status — typically schema
    /// validation (unknown field code, bad value type) or auth.
    #[error("store rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// The record-store capability consumed by the orchestrator.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record; returns the new record's identifier.
    async fn create_record(&self, record: &ExternalRecord) -> Result<String, StoreError>;

    /// Partially update an existing record.
    async fn update_record(&self, record_id: &str, patch: &ExternalRecord)
        -> Result<(), StoreError>;

    /// Upload a file; returns the file key to reference from a record.
    async fn upload_attachment(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, StoreError>;
}

/// Kintone REST client scoped to one app.
///
/// Auth is an app API token sent as `X-Cybozu-API-Token` on every request.
pub struct KintoneClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    app_id: String,
}

const API_TOKEN_HEADER: &str = "X-Cybozu-API-Token";

/// Per-request deadline; a hung store call must not outlive the host's
/// own invocation timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

impl KintoneClient {
    /// Build a client from validated configuration.
    pub fn new(config: &IntakeConfig) -> Self {
        Self::with_credentials(
            &config.store_base_url,
            &config.store_api_token,
            &config.store_app_id,
        )
    }

    pub fn with_credentials(base_url: &str, api_token: &str, app_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            // Operators paste the portal URL with a trailing slash often
            // enough that we normalise here rather than 404 on `//k/v1`.
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            app_id: app_id.to_string(),
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/k/v1/{resource}.json", self.base_url)
    }

    /// Check the status and parse the body, folding both failure shapes
    /// into [`StoreError`].
    async fn parse_response(response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| StoreError::Transport(e.to_string()))
    }
}

/// Pull the record id out of a create-record response.
///
/// Kintone returns the id as a JSON string; tolerate a bare number as well
/// rather than failing a committed record on a representation detail.
fn record_id_from(value: &Value) -> Result<String, StoreError> {
    match value.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(StoreError::Transport(format!(
            "create-record response missing id: {value}"
        ))),
    }
}

/// Pull the file key out of an upload response.
fn file_key_from(value: &Value) -> Result<String, StoreError> {
    value
        .get("fileKey")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            StoreError::Transport(format!("upload response missing fileKey: {value}"))
        })
}

#[async_trait]
impl RecordStore for KintoneClient {
    async fn create_record(&self, record: &ExternalRecord) -> Result<String, StoreError> {
        let response = self
            .http
            .post(self.endpoint("record"))
            .header(API_TOKEN_HEADER, &self.api_token)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&json!({ "app": self.app_id, "record": record }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let body = Self::parse_response(response).await?;
        let id = record_id_from(&body)?;
        debug!("Created record {id} in app {}", self.app_id);
        Ok(id)
    }

    async fn update_record(
        &self,
        record_id: &str,
        patch: &ExternalRecord,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .put(self.endpoint("record"))
            .header(API_TOKEN_HEADER, &self.api_token)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&json!({ "app": self.app_id, "id": record_id, "record": patch }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Self::parse_response(response).await?;
        Ok(())
    }

    async fn upload_attachment(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, StoreError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint("file"))
            .header(API_TOKEN_HEADER, &self.api_token)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let body = Self::parse_response(response).await?;
        file_key_from(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = KintoneClient::with_credentials("https://x.cybozu.com/", "t", "1");
        assert_eq!(
            client.endpoint("record"),
            "https://x.cybozu.com/k/v1/record.json"
        );
    }

    #[test]
    fn record_id_accepts_string_or_number() {
        assert_eq!(record_id_from(&json!({"id": "7"})).unwrap(), "7");
        assert_eq!(record_id_from(&json!({"id": 7})).unwrap(), "7");
        assert!(record_id_from(&json!({"revision": "1"})).is_err());
    }

    #[test]
    fn file_key_requires_a_string() {
        assert_eq!(
            file_key_from(&json!({"fileKey": "abc"})).unwrap(),
            "abc"
        );
        assert!(file_key_from(&json!({})).is_err());
    }
}
