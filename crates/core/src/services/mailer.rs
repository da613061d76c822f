//! Outbound mail.

use async_trait::async_trait;
use cinelog_common::{AppError, AppResult, config::MailConfig, config::SmtpConfig};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;

/// A plain text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery seam.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()>;
}

fn mailbox(address: &str) -> AppResult<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| AppError::Mail(format!("Invalid address {address}: {e}")))
}

/// Build the MIME message for a mail.
pub fn build_message(mail: &OutgoingMail) -> AppResult<Message> {
    Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())
        .map_err(|e| AppError::Mail(e.to_string()))
}

/// SMTP relay delivery.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a mailer for the configured relay.
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Mail(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()> {
        build_message(mail)?;
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "SMTP not configured, mail logged only"
        );
        Ok(())
    }
}

/// Pick the mailer for the configuration.
pub fn mailer_from_config(config: &MailConfig) -> AppResult<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mail(from: &str) -> OutgoingMail {
        OutgoingMail {
            from: from.to_string(),
            to: "ops@example.com".to_string(),
            subject: "New Feedback Received".to_string(),
            body: "hello".to_string(),
        }
    }

    #[test]
    fn test_build_message_sets_headers() {
        let message = build_message(&mail("viewer@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: viewer@example.com"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Subject: New Feedback Received"));
    }

    #[test]
    fn test_build_message_rejects_bad_sender() {
        assert!(matches!(
            build_message(&mail("not an address")),
            Err(AppError::Mail(_))
        ));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_valid_mail() {
        assert!(LogMailer.send(&mail("viewer@example.com")).await.is_ok());
    }
}
