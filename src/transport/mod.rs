//! Mail transports and sender identity.
//!
//! The dispatch loop only sees the [`Transport`] trait. Which implementation
//! backs it is decided once, from [`MailConfig`], by [`resolve_transport`]:
//! a configured SMTP host gives the live [`SmtpMailer`], anything else a
//! non-recording [`DryRunTransport`].

pub mod dry_run;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MailConfig;
use crate::error::{DispatchError, TransportError, ValidationIssue};

pub use dry_run::DryRunTransport;
pub use smtp::SmtpMailer;

/// A fully rendered message ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Formatted sender mailbox, `Name <email>` or a bare address.
    pub from: String,
    /// Formatted recipient mailbox, `Name <email>` or a bare address.
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub headers: Vec<(String, String)>,
}

/// What a transport reports back for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Transport-specific rendering of the message (dry run only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<serde_json::Value>,
}

/// Anything that can accept a message.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, TransportError>;
}

/// The transport picked for this process and whether it is a dry run.
#[derive(Clone)]
pub struct ResolvedTransport {
    pub transport: Arc<dyn Transport>,
    pub dry_run: bool,
}

impl std::fmt::Debug for ResolvedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTransport")
            .field("transport", &self.transport.name())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Live SMTP when a host is configured, dry run otherwise.
pub fn resolve_transport(config: &MailConfig) -> Result<ResolvedTransport, TransportError> {
    match config.host.as_deref() {
        Some(host) => {
            info!(host, port = config.port, secure = config.secure, "Using SMTP transport");
            Ok(ResolvedTransport {
                transport: Arc::new(SmtpMailer::new(config)?),
                dry_run: false,
            })
        }
        None => {
            info!("No SMTP_HOST configured, running in dry-run mode");
            Ok(ResolvedTransport {
                transport: Arc::new(DryRunTransport::new()),
                dry_run: true,
            })
        }
    }
}

/// Sender fields as supplied by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SenderInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A resolved sender identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub email: String,
    pub name: Option<String>,
}

impl Sender {
    pub fn mailbox(&self) -> String {
        format_mailbox(self.name.as_deref(), &self.email)
    }
}

/// Request-supplied fields win; config defaults fill the gaps field by field.
///
/// The chosen address must parse. A bad `from.email` is a malformed request,
/// a bad `MAIL_FROM_EMAIL` is a missing sender identity.
pub fn resolve_sender(
    input: Option<&SenderInput>,
    config: &MailConfig,
) -> Result<Sender, DispatchError> {
    let non_blank = |v: Option<&String>| {
        v.map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let email = match non_blank(input.and_then(|i| i.email.as_ref())) {
        Some(email) => {
            if let Some(issue) = sender_issue(&email) {
                return Err(DispatchError::MalformedRequest { issues: vec![issue] });
            }
            email
        }
        None => {
            let email = non_blank(config.default_from_email.as_ref()).ok_or_else(|| {
                DispatchError::MissingSenderIdentity {
                    hint: "Provide from.email in the request or set MAIL_FROM_EMAIL.".into(),
                }
            })?;
            if !is_valid_email(&email) {
                return Err(DispatchError::MissingSenderIdentity {
                    hint: format!("MAIL_FROM_EMAIL {email:?} is not a valid email address."),
                });
            }
            email
        }
    };
    let name = non_blank(input.and_then(|i| i.name.as_ref()))
        .or_else(|| non_blank(config.default_from_name.as_ref()));

    Ok(Sender { email, name })
}

/// The `from.email` issue for a non-blank address that does not parse.
pub fn sender_issue(email: &str) -> Option<ValidationIssue> {
    (!email.trim().is_empty() && !is_valid_email(email))
        .then(|| ValidationIssue::new("from.email", format!("Invalid email address: {email}")))
}

pub fn is_valid_email(address: &str) -> bool {
    address.trim().parse::<lettre::Address>().is_ok()
}

/// `Name <email>` when a display name is present, the bare address otherwise.
///
/// Names containing RFC 5322 specials are quoted so the result still parses.
pub fn format_mailbox(name: Option<&str>, email: &str) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.contains(|c: char| "()<>[]:;@\\,.\"".contains(c)) => {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\" <{email}>")
        }
        Some(name) => format!("{name} <{email}>"),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_defaults(email: Option<&str>, name: Option<&str>) -> MailConfig {
        MailConfig {
            default_from_email: email.map(String::from),
            default_from_name: name.map(String::from),
            ..MailConfig::default()
        }
    }

    #[test]
    fn request_sender_wins() {
        let input = SenderInput {
            email: Some("ops@example.com".into()),
            name: Some("Ops".into()),
        };
        let config = config_with_defaults(Some("default@example.com"), Some("Default"));
        let sender = resolve_sender(Some(&input), &config).unwrap();
        assert_eq!(sender.email, "ops@example.com");
        assert_eq!(sender.name.as_deref(), Some("Ops"));
    }

    #[test]
    fn falls_back_to_config_per_field() {
        let input = SenderInput {
            email: Some("ops@example.com".into()),
            name: None,
        };
        let config = config_with_defaults(Some("default@example.com"), Some("Default"));
        let sender = resolve_sender(Some(&input), &config).unwrap();
        assert_eq!(sender.email, "ops@example.com");
        assert_eq!(sender.name.as_deref(), Some("Default"));

        let sender = resolve_sender(None, &config).unwrap();
        assert_eq!(sender.email, "default@example.com");
    }

    #[test]
    fn blank_request_email_falls_back() {
        let input = SenderInput {
            email: Some("  ".into()),
            name: None,
        };
        let config = config_with_defaults(Some("default@example.com"), None);
        let sender = resolve_sender(Some(&input), &config).unwrap();
        assert_eq!(sender.email, "default@example.com");
        assert_eq!(sender.mailbox(), "default@example.com");
    }

    #[test]
    fn no_email_anywhere_is_missing_identity() {
        let input = SenderInput {
            email: None,
            name: Some("Ops".into()),
        };
        let err = resolve_sender(Some(&input), &MailConfig::default()).unwrap_err();
        assert!(matches!(err, DispatchError::MissingSenderIdentity { .. }));
    }

    #[test]
    fn invalid_request_email_is_malformed() {
        let input = SenderInput {
            email: Some("not-an-address".into()),
            name: None,
        };
        let config = config_with_defaults(Some("default@example.com"), None);
        match resolve_sender(Some(&input), &config).unwrap_err() {
            DispatchError::MalformedRequest { issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].path, "from.email");
            }
            other => panic!("Expected MalformedRequest, got {other:?}"),
        }
    }

    #[test]
    fn invalid_configured_email_is_missing_identity() {
        let config = config_with_defaults(Some("ops-at-example"), None);
        let err = resolve_sender(None, &config).unwrap_err();
        match err {
            DispatchError::MissingSenderIdentity { hint } => assert!(hint.contains("MAIL_FROM_EMAIL")),
            other => panic!("Expected MissingSenderIdentity, got {other:?}"),
        }
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email(" ana@example.com "));
        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn mailbox_formatting() {
        assert_eq!(format_mailbox(Some("Ana"), "ana@example.com"), "Ana <ana@example.com>");
        assert_eq!(format_mailbox(None, "ana@example.com"), "ana@example.com");
        assert_eq!(format_mailbox(Some("  "), "ana@example.com"), "ana@example.com");
        assert_eq!(
            format_mailbox(Some("Doe, Jane"), "jane@example.com"),
            "\"Doe, Jane\" <jane@example.com>"
        );
    }

    #[test]
    fn missing_host_resolves_to_dry_run() {
        let resolved = resolve_transport(&MailConfig::default()).unwrap();
        assert!(resolved.dry_run);
        assert_eq!(resolved.transport.name(), "dry-run");
    }

    #[test]
    fn configured_host_resolves_to_smtp() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let config = MailConfig {
            host: Some("smtp.example.com".into()),
            ..MailConfig::default()
        };
        let resolved = resolve_transport(&config).unwrap();
        assert!(!resolved.dry_run);
        assert_eq!(resolved.transport.name(), "smtp");
    }
}
