//! Turns a resolved recipient into a wire-ready [`OutboundMessage`].

use crate::campaign::{AgentBatch, Recipient};
use crate::transport::{OutboundMessage, Sender, format_mailbox};

pub const AGENT_ID_HEADER: &str = "X-Mailcast-Agent-Id";
pub const AGENT_NAME_HEADER: &str = "X-Mailcast-Agent-Name";

/// Build the envelope for one recipient of one agent.
pub fn build_envelope(sender: &Sender, batch: &AgentBatch, recipient: &Recipient) -> OutboundMessage {
    OutboundMessage {
        from: sender.mailbox(),
        to: format_mailbox(recipient.name.as_deref(), &recipient.to),
        subject: recipient.subject.clone(),
        text: recipient.body.clone(),
        html: html_body(&recipient.body),
        headers: vec![
            (AGENT_ID_HEADER.to_string(), batch.agent_id.clone()),
            (AGENT_NAME_HEADER.to_string(), batch.agent_name.clone()),
        ],
    }
}

/// Escaped text with line breaks, wrapped in a simple styled container.
pub fn html_body(text: &str) -> String {
    let escaped = escape_html(text).replace("\r\n", "\n").replace('\n', "<br />");
    format!(
        "<div style=\"font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; \
         font-size: 14px; line-height: 1.6; color: #1f2933;\">{escaped}</div>"
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
