//! Mail notification: send the rendered document to the consulting office.
//!
//! This path is independent of the record pipeline — it exists on the
//! standalone document endpoint and is best-effort there: a failed delivery
//! logs and degrades, it never fails the request. The capability trait keeps
//! SMTP out of the orchestrator; the production [`SmtpMailer`] lives behind
//! the `smtp` feature so record-only deployments do not pull in lettre.

use async_trait::async_trait;

use crate::error::DocumentError;
use crate::render::RenderedDocument;
use crate::submission::NormalizedSubmission;

/// The outbound-mail capability.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver the rendered document with a notification summary.
    async fn send(
        &self,
        document: &RenderedDocument,
        submission: &NormalizedSubmission,
    ) -> Result<(), DocumentError>;
}

/// Subject line: `【日田市移住定住相談】新規申請 - {姓}{名}様`.
pub fn notification_subject(s: &NormalizedSubmission) -> String {
    format!(
        "【日田市移住定住相談】新規申請 - {}{}様",
        s.last_name, s.first_name
    )
}

/// Plain-text body summarising the applicant; details go in the PDF.
pub fn notification_body(s: &NormalizedSubmission) -> String {
    format!(
        "日田市移住定住相談フォームから新しい申請がありました。\n\n\
         申請者: {} {}\n\
         電話番号: {}\n\
         メールアドレス: {}\n\
         移住人数: {}名\n\n\
         詳細は添付のPDFをご確認ください。\n",
        s.last_name, s.first_name, s.phone, s.email, s.immigrant_count
    )
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use super::{notification_body, notification_subject, MailSender};
    use crate::config::MailConfig;
    use crate::error::DocumentError;
    use crate::render::RenderedDocument;
    use crate::submission::NormalizedSubmission;
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
    use tracing::info;

    /// Production mail sender speaking SMTP via lettre.
    ///
    /// Port 465 selects implicit TLS, anything else STARTTLS — mirroring
    /// the usual submission-port conventions.
    pub struct SmtpMailer {
        config: MailConfig,
    }

    impl SmtpMailer {
        pub fn new(config: MailConfig) -> Self {
            Self { config }
        }

        fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DocumentError> {
            let builder = if self.config.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            }
            .map_err(mail_err)?;

            Ok(builder
                .port(self.config.port)
                .credentials(Credentials::new(
                    self.config.user.clone(),
                    self.config.pass.clone(),
                ))
                .build())
        }
    }

    #[async_trait]
    impl MailSender for SmtpMailer {
        async fn send(
            &self,
            document: &RenderedDocument,
            submission: &NormalizedSubmission,
        ) -> Result<(), DocumentError> {
            let from: Mailbox = self.config.user.parse().map_err(mail_err)?;
            let to: Mailbox = self.config.to.parse().map_err(mail_err)?;

            let pdf = Attachment::new(document.file_name.clone()).body(
                document.bytes.clone(),
                ContentType::parse("application/pdf").map_err(mail_err)?,
            );

            let message = Message::builder()
                .from(from)
                .to(to)
                .subject(notification_subject(submission))
                .multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(notification_body(submission)))
                        .singlepart(pdf),
                )
                .map_err(mail_err)?;

            self.transport()?.send(message).await.map_err(mail_err)?;
            info!("Notification mail sent to {}", self.config.to);
            Ok(())
        }
    }

    fn mail_err(e: impl std::fmt::Display) -> DocumentError {
        DocumentError::Mail {
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant() -> NormalizedSubmission {
        NormalizedSubmission {
            last_name: "山田".into(),
            first_name: "太郎".into(),
            phone: "0973-00-0000".into(),
            email: "taro@example.jp".into(),
            immigrant_count: "3".into(),
            ..Default::default()
        }
    }

    #[test]
    fn subject_addresses_the_applicant() {
        assert_eq!(
            notification_subject(&applicant()),
            "【日田市移住定住相談】新規申請 - 山田太郎様"
        );
    }

    #[test]
    fn body_summarises_contact_details() {
        let body = notification_body(&applicant());
        assert!(body.contains("山田 太郎"));
        assert!(body.contains("0973-00-0000"));
        assert!(body.contains("3名"));
        assert!(body.contains("添付のPDF"));
    }
}
