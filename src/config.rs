//! Configuration for the intake pipeline.
//!
//! All behaviour is controlled through [`IntakeConfig`], loaded once at
//! process start from the environment ([`IntakeConfig::from_env`]) or built
//! programmatically via [`IntakeConfigBuilder`]. The config is read-only for
//! the lifetime of the process and shared by reference into every request.
//!
//! # Design choice: validate before any network call
//!
//! The required store settings are checked by [`IntakeConfig::validate`]
//! inside the orchestrator, *before* a client is constructed. A deployment
//! missing its API token fails every request fast with a clear
//! [`IntakeError::MissingConfig`] instead of a confusing upstream 401.

use crate::error::IntakeError;
use crate::mail::MailSender;
use crate::render::PdfRenderer;
use crate::store::RecordStore;
use std::fmt;
use std::sync::Arc;

/// Configuration for intake submissions.
///
/// # Example
/// ```rust
/// use relocation_intake::IntakeConfig;
///
/// let config = IntakeConfig::builder()
///     .store_base_url("https://example.cybozu.com")
///     .store_api_token("token")
///     .store_app_id("12")
///     .enable_pdf(true)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct IntakeConfig {
    /// Base URL of the record store, e.g. `https://example.cybozu.com`.
    /// A trailing slash is tolerated and trimmed by the client.
    pub store_base_url: String,

    /// API token authenticating against the intake app.
    pub store_api_token: String,

    /// Identifier of the record-store app holding intake records.
    pub store_app_id: String,

    /// Whether the document stage (render → upload → attach) runs after
    /// record creation. Default: false — record-only submissions.
    pub enable_pdf: bool,

    /// SMTP settings for the notification mail on the standalone document
    /// endpoint. `None` disables mail entirely.
    pub mail: Option<MailConfig>,

    /// Pre-constructed record store. Takes precedence over the client built
    /// from `store_base_url`/`store_api_token`. Used by tests to inject a
    /// double and by hosts that need custom middleware.
    pub store: Option<Arc<dyn RecordStore>>,

    /// Pre-constructed renderer. Takes precedence over the default
    /// headless-Chromium renderer.
    pub renderer: Option<Arc<dyn PdfRenderer>>,

    /// Pre-constructed mail sender. Takes precedence over the SMTP sender
    /// built from `mail`.
    pub mailer: Option<Arc<dyn MailSender>>,
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("store_base_url", &self.store_base_url)
            .field("store_api_token", &"<redacted>")
            .field("store_app_id", &self.store_app_id)
            .field("enable_pdf", &self.enable_pdf)
            .field("mail", &self.mail)
            .field("store", &self.store.as_ref().map(|_| "<dyn RecordStore>"))
            .field(
                "renderer",
                &self.renderer.as_ref().map(|_| "<dyn PdfRenderer>"),
            )
            .field("mailer", &self.mailer.as_ref().map(|_| "<dyn MailSender>"))
            .finish()
    }
}

impl IntakeConfig {
    /// Create a new builder.
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// | Variable            | Meaning                               |
    /// |---------------------|---------------------------------------|
    /// | `KINTONE_BASE_URL`  | record-store base URL (required)      |
    /// | `KINTONE_API_TOKEN` | record-store API token (required)     |
    /// | `KINTONE_APP_ID`    | record-store app id (required)        |
    /// | `ENABLE_PDF`        | `"true"` enables the document stage   |
    /// | `EMAIL_HOST`        | SMTP host (mail optional)             |
    /// | `EMAIL_PORT`        | SMTP port, default 587                |
    /// | `EMAIL_USER`        | SMTP user                             |
    /// | `EMAIL_PASS`        | SMTP password                         |
    /// | `EMAIL_TO`          | notification recipient                |
    ///
    /// Missing *required* variables are not an error here — loading is
    /// total so the process can start and report config problems per
    /// request via [`IntakeConfig::validate`].
    pub fn from_env() -> Self {
        let env = |k: &str| std::env::var(k).unwrap_or_default();

        Self {
            store_base_url: env("KINTONE_BASE_URL"),
            store_api_token: env("KINTONE_API_TOKEN"),
            store_app_id: env("KINTONE_APP_ID"),
            enable_pdf: env("ENABLE_PDF") == "true",
            mail: MailConfig::from_env(),
            store: None,
            renderer: None,
            mailer: None,
        }
    }

    /// Check that the required store settings are present.
    ///
    /// The orchestrator calls this before constructing any collaborator.
    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.store_base_url.is_empty() {
            return Err(IntakeError::MissingConfig {
                name: "KINTONE_BASE_URL",
            });
        }
        if self.store_api_token.is_empty() {
            return Err(IntakeError::MissingConfig {
                name: "KINTONE_API_TOKEN",
            });
        }
        if self.store_app_id.is_empty() {
            return Err(IntakeError::MissingConfig {
                name: "KINTONE_APP_ID",
            });
        }
        Ok(())
    }
}

/// SMTP settings for the notification mail.
#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    /// Submission port; 465 switches the transport to implicit TLS.
    pub port: u16,
    pub user: String,
    pub pass: String,
    /// Recipient of the notification (the consulting office inbox).
    pub to: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("to", &self.to)
            .finish()
    }
}

impl MailConfig {
    /// Read SMTP settings from the environment; `None` unless host, user,
    /// password and recipient are all present.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("EMAIL_HOST").ok().filter(|s| !s.is_empty())?;
        let user = std::env::var("EMAIL_USER").ok().filter(|s| !s.is_empty())?;
        let pass = std::env::var("EMAIL_PASS").ok().filter(|s| !s.is_empty())?;
        let to = std::env::var("EMAIL_TO").ok().filter(|s| !s.is_empty())?;
        let port = std::env::var("EMAIL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);

        Some(Self {
            host,
            port,
            user,
            pass,
            to,
        })
    }
}

/// Builder for [`IntakeConfig`].
#[derive(Debug)]
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn store_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.store_base_url = url.into();
        self
    }

    pub fn store_api_token(mut self, token: impl Into<String>) -> Self {
        self.config.store_api_token = token.into();
        self
    }

    pub fn store_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.store_app_id = app_id.into();
        self
    }

    pub fn enable_pdf(mut self, v: bool) -> Self {
        self.config.enable_pdf = v;
        self
    }

    pub fn mail(mut self, mail: MailConfig) -> Self {
        self.config.mail = Some(mail);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn MailSender>) -> Self {
        self.config.mailer = Some(mailer);
        self
    }

    /// Build the configuration. Presence of the required store settings is
    /// deliberately *not* checked here — see [`IntakeConfig::validate`].
    pub fn build(self) -> IntakeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> IntakeConfig {
        IntakeConfig::builder()
            .store_base_url("https://example.cybozu.com")
            .store_api_token("s3cret-api-token")
            .store_app_id("12")
            .build()
    }

    #[test]
    fn validate_accepts_complete_store_settings() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_reports_first_missing_setting() {
        let mut config = valid();
        config.store_api_token.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KINTONE_API_TOKEN"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = valid();
        config.mail = Some(MailConfig {
            host: "smtp.example.com".into(),
            port: 587,
            user: "intake".into(),
            pass: "hunter2".into(),
            to: "office@example.jp".into(),
        });
        let dump = format!("{config:?}");
        assert!(!dump.contains("hunter2"));
        assert!(!dump.contains("s3cret-api-token"), "api token must be redacted");
    }
}
