//! SMTP email adapter built on `lettre`.

use crate::config::EmailConfig;
use crate::core::{ChannelSender, SendResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::warn;

pub const CHANNEL_TYPE: &str = "email";

/// Sends plain-text mail through a configured SMTP relay.
pub struct EmailSender {
    config: EmailConfig,
}

impl EmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );
        // `tls = true` means implicit TLS on connect; otherwise STARTTLS
        // is negotiated after the plain connection.
        let builder = if self.config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
        };
        Ok(builder
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build())
    }

    /// Builds the message, skipping recipients whose address does not
    /// parse as a mailbox.
    fn build_message(&self, to: &[String], title: &str, content: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .with_context(|| format!("invalid from address: {}", self.config.from))?;

        let mut builder = Message::builder().from(from).subject(title);
        let mut accepted = 0usize;
        for addr in to {
            match addr.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    accepted += 1;
                }
                Err(error) => {
                    warn!(address = %addr, %error, "skipping invalid email address");
                }
            }
        }
        if accepted == 0 {
            bail!("no valid email address among {} recipients", to.len());
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(content.to_string())
            .context("failed to build email message")
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, to: &[String], title: &str, content: &str) -> Result<SendResult> {
        let result = SendResult::pending(CHANNEL_TYPE);
        let message = self.build_message(to, title, content)?;
        let transport = self.transport()?;
        transport
            .send(message)
            .await
            .context("smtp delivery failed")?;
        Ok(result.completed())
    }

    fn channel_type(&self) -> &'static str {
        CHANNEL_TYPE
    }
}
