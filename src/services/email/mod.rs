pub mod templates;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::EmailConfig;
use crate::models::notification::OutgoingEmail;

pub use templates::EmailTemplates;

/// Delivers a rendered email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// SMTP mailer for payment notifications
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration
    pub fn new(config: &EmailConfig) -> Result<Self> {
        // Port 1025 is typically used for MailHog/local testing (no TLS)
        let use_tls = config.smtp_port != 1025;
        let timeout = Some(Duration::from_secs(config.timeout_secs));

        let mailer = if use_tls {
            let creds =
                Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("Failed to create SMTP transport with TLS")?
                .port(config.smtp_port)
                .credentials(creds)
                .timeout(timeout)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(timeout)
                .build()
        };

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .context("Failed to parse from address")?;

        info!(
            "Email transport initialized: {}:{} (TLS: {})",
            config.smtp_host, config.smtp_port, use_tls
        );

        Ok(Self { mailer, from })
    }
}

/// Build a multipart message with HTML and plain text alternatives
pub fn build_message(from: Mailbox, email: &OutgoingEmail) -> Result<Message> {
    let to: Mailbox = email
        .to
        .parse()
        .context("Failed to parse recipient address")?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .context("Failed to build email message")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(self.from.clone(), email)?;

        match self.mailer.send(message).await {
            Ok(_) => {
                info!("Email sent to {}: {}", email.to, email.subject);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", email.to, e);
                Err(anyhow::anyhow!("Failed to send email: {}", e))
            }
        }
    }
}
