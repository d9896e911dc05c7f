use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::errors::AppError;

/// Implicit-TLS submission port; every other port negotiates STARTTLS.
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// No transport configured; the message was only logged.
    Skipped,
}

/// Outbound channel for the digest.
#[async_trait]
pub trait DigestSender: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<SendOutcome, AppError>;
}

/// SMTP mailer. With an empty host it only logs, so local runs need no mail server.
#[derive(Clone)]
pub struct SmtpSender {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, AppError> {
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid DIGEST_SENDER address: {e}")))?;

        let transport = if smtp.host.trim().is_empty() {
            warn!("SMTP host not configured; digest mailer will operate in no-op mode");
            None
        } else {
            let builder = if smtp.port == SMTPS_PORT {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            }
            .map_err(|e| AppError::Email(format!("Failed to configure SMTP transport: {e}")))?
            .port(smtp.port);

            let builder = match (&smtp.username, &smtp.password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl DigestSender for SmtpSender {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<SendOutcome, AppError> {
        let Some(transport) = &self.transport else {
            info!(
                subject,
                recipient, "Digest mailer in no-op mode; skipping actual send"
            );
            return Ok(SendOutcome::Skipped);
        };

        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::Email(format!("Failed to build digest message: {e}")))?;

        transport
            .send(email)
            .await
            .map_err(|e| AppError::Email(format!("Failed to send digest: {e}")))?;

        info!(subject, "Digest email sent");
        Ok(SendOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(host: &str) -> SmtpConfig {
        SmtpConfig {
            host: host.to_string(),
            port: 587,
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn test_empty_host_is_noop() {
        let sender = SmtpSender::new(&smtp(""), "agent@example.com").unwrap();
        assert!(!sender.is_enabled());
        let outcome = sender
            .send("me@example.com", "subject", "<p>hi</p>")
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Skipped);
    }

    #[test]
    fn test_invalid_from_address_rejected() {
        let err = SmtpSender::new(&smtp(""), "not an address").err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_configured_host_enables_transport() {
        let sender = SmtpSender::new(&smtp("smtp.example.com"), "agent@example.com").unwrap();
        assert!(sender.is_enabled());
    }
}
