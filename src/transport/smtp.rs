//! Live SMTP transport via lettre.

use async_trait::async_trait;
use lettre::message::header::{HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use uuid::Uuid;

use super::{OutboundMessage, SendReceipt, Transport};
use crate::config::MailConfig;
use crate::error::TransportError;

/// SMTP relay built once from [`MailConfig`]; connections are pooled by lettre.
pub struct SmtpMailer {
    inner: SmtpTransport,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, TransportError> {
        let host = config
            .host
            .clone()
            .ok_or_else(|| TransportError::Build("SMTP_HOST is not set".into()))?;

        let builder = if config.secure {
            SmtpTransport::relay(&host)
        } else {
            SmtpTransport::starttls_relay(&host)
        }
        .map_err(|e| TransportError::Build(format!("SMTP relay error: {e}")))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(user), password) => builder.credentials(Credentials::new(
                user.clone(),
                password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string())
                    .unwrap_or_default(),
            )),
            (None, _) => builder,
        };

        Ok(Self {
            inner: builder.build(),
            host,
        })
    }
}

#[async_trait]
impl Transport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, TransportError> {
        let message_id = format!("<{}@mailcast>", Uuid::new_v4());
        let email = build_message(message, &message_id)?;

        let mailer = self.inner.clone();
        let response = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?
            .map_err(|e| TransportError::Send(format!("SMTP send failed: {e}")))?;

        debug!(
            host = %self.host,
            reply = response.first_line().unwrap_or(""),
            "SMTP server accepted message"
        );
        info!("Email sent to {}", message.to);

        Ok(SendReceipt {
            message_id: Some(message_id),
            preview: None,
        })
    }
}

/// Build a `multipart/alternative` lettre message from an outbound envelope.
pub(crate) fn build_message(
    message: &OutboundMessage,
    message_id: &str,
) -> Result<Message, TransportError> {
    let from = parse_mailbox(&message.from)?;
    let to = parse_mailbox(&message.to)?;

    let mut builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .message_id(Some(message_id.to_string()));

    for (name, value) in &message.headers {
        let header = HeaderName::new_from_ascii(name.clone())
            .map_err(|e| TransportError::Build(format!("Invalid header name {name}: {e}")))?;
        builder = builder.raw_header(HeaderValue::new(header, value.clone()));
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))
        .map_err(|e| TransportError::Build(format!("Failed to build email: {e}")))
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, TransportError> {
    raw.parse().map_err(|e| TransportError::InvalidAddress {
        address: raw.to_string(),
        reason: format!("{e}"),
    })
}
