use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use service_core::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::InvalidRecipient(_) => AppError::bad_request(err),
            other => AppError::EmailError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError>;
    async fn health_check(&self) -> Result<(), MailError>;
    fn is_enabled(&self) -> bool;
}

pub struct SmtpMailer {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn message_id(&self) -> String {
        let domain = self
            .config
            .from_email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost");
        format!("<{}@{}>", Uuid::new_v4(), domain)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|e| MailError::InvalidRecipient(format!("{}: {}", address, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            MailError::NotEnabled("SMTP mail transport is not enabled".to_string())
        })?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| MailError::Configuration(format!("Invalid from address: {}", e)))?;

        let message_id = self.message_id();
        let mut builder = Message::builder()
            .from(from)
            .to(mailbox(&mail.to)?)
            .subject(&mail.subject)
            .message_id(Some(message_id.clone()));
        for cc in &mail.cc {
            builder = builder.cc(mailbox(cc)?);
        }

        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone());

        let built = if mail.attachments.is_empty() {
            builder.singlepart(html)
        } else {
            let mut body = MultiPart::mixed().singlepart(html);
            for attachment in &mail.attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .or_else(|_| ContentType::parse("application/octet-stream"))
                    .map_err(|e| MailError::Configuration(format!("Invalid content type: {}", e)))?;
                body = body.singlepart(
                    Attachment::new(attachment.file_name.clone())
                        .body(attachment.data.clone(), content_type),
                );
            }
            builder.multipart(body)
        };
        let message = built
            .map_err(|e| MailError::SendFailed(format!("Failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(format!("Failed to send email: {}", e)))?;

        tracing::info!(
            to = %mail.to,
            cc = mail.cc.len(),
            attachments = mail.attachments.len(),
            subject = %mail.subject,
            "Email sent successfully"
        );

        Ok(SentMail {
            message_id: Some(message_id),
        })
    }

    async fn health_check(&self) -> Result<(), MailError> {
        let Some(transport) = self.transport.as_ref() else {
            return Ok(());
        };

        transport
            .test_connection()
            .await
            .map_err(|e| MailError::SendFailed(format!("SMTP connection test failed: {}", e)))?;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Records mails instead of sending them. Subjects containing one of the
/// configured fragments fail with `SendFailed`.
pub struct MockMailer {
    send_count: AtomicU64,
    sent: Mutex<Vec<OutgoingMail>>,
    fail_subjects: Mutex<Vec<String>>,
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            fail_subjects: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_when_subject_contains(&self, fragment: impl Into<String>) {
        if let Ok(mut fragments) = self.fail_subjects.lock() {
            fragments.push(fragment.into());
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError> {
        mailbox(&mail.to)?;
        for cc in &mail.cc {
            mailbox(cc)?;
        }

        let failing = self
            .fail_subjects
            .lock()
            .map(|f| f.iter().any(|fragment| mail.subject.contains(fragment.as_str())))
            .unwrap_or(false);
        if failing {
            return Err(MailError::SendFailed("mock transport rejected the message".into()));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }

        tracing::info!(to = %mail.to, subject = %mail.subject, "[MOCK] Email would be sent");

        Ok(SentMail {
            message_id: Some(format!("<mock-{}@localhost>", count)),
        })
    }

    async fn health_check(&self) -> Result<(), MailError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(subject: &str) -> OutgoingMail {
        OutgoingMail {
            to: "site@example.com".into(),
            cc: vec!["pm@example.com".into()],
            subject: subject.into(),
            html: "<p>hi</p>".into(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn mock_counts_and_records() {
        let mailer = MockMailer::new();
        let sent = mailer.send(&mail("TDS for cement")).await.unwrap();
        assert_eq!(sent.message_id.as_deref(), Some("<mock-1@localhost>"));
        assert_eq!(mailer.send_count(), 1);
        assert_eq!(mailer.sent()[0].subject, "TDS for cement");
    }

    #[tokio::test]
    async fn mock_failure_injection() {
        let mailer = MockMailer::new();
        mailer.fail_when_subject_contains("Villa");
        let err = mailer.send(&mail("Shop drawings - Villa")).await.unwrap_err();
        assert!(matches!(err, MailError::SendFailed(_)));
        assert!(mailer.send(&mail("Shop drawings - Annex")).await.is_ok());
        assert_eq!(mailer.send_count(), 1);
    }

    #[tokio::test]
    async fn invalid_recipient_is_a_bad_request() {
        let mailer = MockMailer::new();
        let mut bad = mail("x");
        bad.to = "not-an-address".into();
        let err = mailer.send(&bad).await.unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn disabled_smtp_builds_without_transport() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@company.com".into(),
            from_name: "Materials Tracking System".into(),
            enabled: false,
        };
        let mailer = SmtpMailer::new(config).unwrap();
        assert!(!mailer.is_enabled());
        assert!(mailer.message_id().ends_with("@company.com>"));
    }
}
